use tads_models::{
    AnalystBrief, AnalystKind, DebateTranscript, MemoryRecord, Query, Speaker, ToolCallRecord,
    ToolOutcome,
};

/// Tools each analyst may call, in call order. The set is fixed per role;
/// which roles run is configuration.
pub fn tools_for(kind: AnalystKind) -> &'static [&'static str] {
    match kind {
        AnalystKind::Market => &["price_history", "technical_indicators"],
        AnalystKind::Social => &["social_sentiment"],
        AnalystKind::News => &["company_news", "global_news"],
        AnalystKind::Fundamentals => &["fundamental_statements", "insider_transactions"],
    }
}

pub fn analyst_system_prompt(kind: AnalystKind) -> String {
    let (role, focus) = match kind {
        AnalystKind::Market => (
            "market analyst",
            "price action, volatility and technical indicator readings",
        ),
        AnalystKind::Social => (
            "social media analyst",
            "retail sentiment, discussion volume and crowd positioning",
        ),
        AnalystKind::News => (
            "news analyst",
            "company headlines, macro events and their likely price impact",
        ),
        AnalystKind::Fundamentals => (
            "fundamentals analyst",
            "financial statements, valuation and insider activity",
        ),
    };
    format!(
        "You are the {role} on a trading research desk. Write a concise brief on the \
         requested instrument covering {focus}.\n\n\
         Rules:\n\
         - Use only information available up to and including the as-of date.\n\
         - Ground every claim in the tool results provided; where a tool call failed, \
         say explicitly what is missing and how that limits the brief.\n\
         - If past lessons are provided, note any that apply.\n\
         - Plain prose, no markdown tables, at most a few paragraphs."
    )
}

pub fn researcher_system_prompt(speaker: Speaker) -> String {
    let (role, stance) = match speaker {
        Speaker::Bull => (
            "bull researcher",
            "argue the strongest good-faith case FOR taking a long position",
        ),
        Speaker::Bear => (
            "bear researcher",
            "argue the strongest good-faith case AGAINST taking a long position",
        ),
    };
    format!(
        "You are the {role} in an adversarial investment debate. Your job is to {stance}.\n\n\
         Rules:\n\
         - Cite the analyst briefs and any past lessons; do not invent data.\n\
         - If an opposing turn is shown, rebut its specific points first, then extend \
         your own case.\n\
         - Be direct and conversational; no bullet lists."
    )
}

pub fn trader_system_prompt() -> String {
    "You are the trader responsible for the desk's final call. Synthesize the analyst \
     briefs, the researcher debate and any past lessons into one recommendation with a \
     clear rationale.\n\n\
     Rules:\n\
     - If the debate transcript is empty, treat it as 'no adversarial review performed' \
     and weigh the briefs directly; that is not an error.\n\
     - Account for degraded or missing inputs explicitly rather than ignoring them.\n\
     - You MUST end your reply with exactly one line of the form:\n\
     FINAL TRANSACTION PROPOSAL: **BUY**, FINAL TRANSACTION PROPOSAL: **SELL** or \
     FINAL TRANSACTION PROPOSAL: **HOLD**"
        .to_string()
}

pub fn reflection_system_prompt() -> String {
    "You are the reflection step of a trading desk's post-mortem process. Given one \
     past decision, its full reasoning trace and the later realized return, write a \
     single-paragraph lesson a future analyst could apply: what the reasoning over- or \
     under-weighted, and what to check next time. Do not restate the whole trace."
        .to_string()
}

pub fn render_lessons(lessons: &[MemoryRecord]) -> String {
    if lessons.is_empty() {
        return "No past lessons for this symbol.".to_string();
    }
    let mut out = String::from("Past lessons (most recent first):\n");
    for lesson in lessons {
        out.push_str(&format!(
            "- [{} {} -> return {}] {}\n",
            lesson.query.as_of_date, lesson.action, lesson.realized_return, lesson.lesson
        ));
    }
    out
}

pub fn render_tool_calls(calls: &[ToolCallRecord]) -> String {
    if calls.is_empty() {
        return "No tool data available for this run.".to_string();
    }
    let mut out = String::from("Tool results:\n");
    for call in calls {
        match &call.outcome {
            ToolOutcome::Ok { result } => {
                out.push_str(&format!("## {} ({})\n{}\n", call.tool_name, call.args, result));
            }
            ToolOutcome::Failed { reason } => {
                out.push_str(&format!("## {} ({})\nFAILED: {}\n", call.tool_name, call.args, reason));
            }
        }
    }
    out
}

pub fn render_briefs(briefs: &[AnalystBrief]) -> String {
    if briefs.is_empty() {
        return "No analyst briefs available.".to_string();
    }
    let mut out = String::new();
    for brief in briefs {
        out.push_str(&format!("## {} brief\n{}\n\n", brief.kind, brief.content));
    }
    out
}

pub fn render_transcript(transcript: &DebateTranscript) -> String {
    if transcript.is_empty() {
        return "No adversarial review performed.".to_string();
    }
    let mut out = String::from("Debate transcript:\n");
    for turn in transcript.turns() {
        let marker = if turn.truncated { " [truncated]" } else { "" };
        out.push_str(&format!(
            "[round {} | {}]{} {}\n",
            turn.round, turn.speaker, marker, turn.content
        ));
    }
    out
}

pub fn analyst_user_prompt(
    query: &Query,
    tool_calls: &[ToolCallRecord],
    lessons: &[MemoryRecord],
) -> String {
    format!(
        "Instrument: {}\nAs-of date: {}\n\n{}\n{}",
        query.symbol,
        query.as_of_date,
        render_tool_calls(tool_calls),
        render_lessons(lessons),
    )
}

pub fn debate_user_prompt(
    query: &Query,
    briefs: &[AnalystBrief],
    transcript: &DebateTranscript,
    lessons: &[MemoryRecord],
) -> String {
    let prior = match transcript.last() {
        Some(turn) => format!("Opposing turn to rebut ({}):\n{}", turn.speaker, turn.content),
        None => "You are opening the debate; there is no prior turn.".to_string(),
    };
    format!(
        "Instrument: {} as of {}\n\n{}\n{}\n{}",
        query.symbol,
        query.as_of_date,
        render_briefs(briefs),
        render_lessons(lessons),
        prior,
    )
}

pub fn trader_user_prompt(
    query: &Query,
    briefs: &[AnalystBrief],
    transcript: &DebateTranscript,
    lessons: &[MemoryRecord],
) -> String {
    format!(
        "Instrument: {} as of {}\n\n{}\n{}\n{}",
        query.symbol,
        query.as_of_date,
        render_briefs(briefs),
        render_transcript(transcript),
        render_lessons(lessons),
    )
}
