//! Display helpers

use chrono::{Datelike, NaiveDate};

use crate::config::Locale;

const PT_BR_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Long-form date, or "Today" when no date is selected
pub fn format_date_display(date: Option<NaiveDate>, locale: Locale) -> String {
    match (date, locale) {
        (None, Locale::En) => "Today".to_string(),
        (None, Locale::PtBr) => "Hoje".to_string(),
        (Some(date), Locale::En) => date.format("%B %-d, %Y").to_string(),
        (Some(date), Locale::PtBr) => format!(
            "{} de {} de {}",
            date.day(),
            PT_BR_MONTHS[date.month0() as usize],
            date.year()
        ),
    }
}

pub fn format_sol_info(sol: u32, locale: Locale) -> String {
    match locale {
        Locale::En => format!("Sol {} (Martian day {})", sol, sol),
        Locale::PtBr => format!("Sol {} (Dia marciano {})", sol, sol),
    }
}

/// "Showing `displayed` of min(`total`, `max`) photos"
pub fn format_photo_count(displayed: usize, total: usize, max: usize, locale: Locale) -> String {
    let shown_of = total.min(max);
    match locale {
        Locale::En => format!("Showing {} of {} photos", displayed, shown_of),
        Locale::PtBr => format!("Exibindo {} de {} fotos", displayed, shown_of),
    }
}
