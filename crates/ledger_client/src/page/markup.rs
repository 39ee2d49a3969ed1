//! Pure string builders for the transactions list.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use shared::protocol::Transaction;

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// `2019-03-10 03:20:41` → `10 марта 2019 г. в 03:20`.
///
/// RFC 3339 timestamps are accepted too and shown in their own offset.
/// Anything unparsable comes back unchanged.
pub fn format_date(raw: &str) -> String {
    let Some(moment) = parse_timestamp(raw) else {
        return raw.to_string();
    };
    format!(
        "{} {} {} г. в {:02}:{:02}",
        moment.day(),
        MONTHS_GENITIVE[moment.month0() as usize],
        moment.year(),
        moment.hour(),
        moment.minute()
    )
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|moment| moment.naive_local())
        })
}

/// One row of the list, keyed by the transaction id on its remove button.
pub fn transaction_html(item: &Transaction) -> String {
    format!(
        r#"<div class="transaction transaction_{kind} row">
    <div class="col-md-7 transaction__details">
        <div class="transaction__icon">
            <span class="fa fa-money fa-2x"></span>
        </div>
        <div class="transaction__info">
            <h4 class="transaction__title">{title}</h4>
            <div class="transaction__date">{date}</div>
        </div>
    </div>
    <div class="col-md-3">
        <div class="transaction__summ">
            {sum} <span class="currency">₽</span>
        </div>
    </div>
    <div class="col-md-2 transaction__controls">
        <button class="btn btn-danger transaction__remove" data-id="{id}">
            <i class="fa fa-trash"></i>
        </button>
    </div>
</div>"#,
        kind = item.kind.as_str(),
        title = escape_html(&item.name),
        date = escape_html(&format_date(&item.created_at)),
        sum = item.sum,
        id = escape_html(item.id.as_str()),
    )
}

pub fn transactions_html(items: &[Transaction]) -> String {
    items.iter().map(transaction_html).collect()
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "../tests/markup_tests.rs"]
mod tests;
