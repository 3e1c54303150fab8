//! System instruction sent with every provider call.

use chrono::{DateTime, Datelike, TimeZone, Weekday};

/// Persona used when none is configured.
pub const DEFAULT_INSTRUCTIONS: &str = "Você é um assistente prestativo especializado em dados \
abertos do Senado Federal e da Câmara dos Deputados. Use as ferramentas disponíveis para \
consultar informações atualizadas antes de responder.";

fn weekday_pt(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "segunda-feira",
        Weekday::Tue => "terça-feira",
        Weekday::Wed => "quarta-feira",
        Weekday::Thu => "quinta-feira",
        Weekday::Fri => "sexta-feira",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// Current date, weekday and time, so the model can resolve relative dates.
pub fn date_context<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Hoje é dia {} (Dia da semana: {}). O horário atual é {}.",
        now.format("%d/%m/%Y"),
        weekday_pt(now.weekday()),
        now.format("%H:%M"),
    )
}

/// Full system instruction: persona, then date context.
pub fn system_instruction<Tz: TimeZone>(instructions: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let instructions = instructions.trim();
    let context = date_context(now);
    if instructions.is_empty() {
        format!("{context} Responda considerando esta data atual.")
    } else {
        format!("{instructions} {context} Responda considerando esta data atual.")
    }
}
