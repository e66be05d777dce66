use stockdash_core::chart::Locale;
use stockdash_core::domain::range::{DateRange, MIN_START_DATE};
use stockdash_core::domain::ticker::{Ticker, DEFAULT_TICKER};

const TEMPLATE: &str = include_str!("../assets/index.html");

struct Labels {
    ticker: &'static str,
    range: &'static str,
    download: &'static str,
    more_charts: &'static str,
}

fn labels(locale: Locale) -> Labels {
    match locale {
        Locale::Uk => Labels {
            ticker: "Виберіть акцію:",
            range: "Виберіть діапазон дат:",
            download: "⬇️ Завантажити CSV",
            more_charts: "📊 Інші візуалізації",
        },
        Locale::En => Labels {
            ticker: "Select a stock:",
            range: "Select a date range:",
            download: "⬇️ Download CSV",
            more_charts: "📊 More charts",
        },
    }
}

/// The dashboard page with inputs preset to `range`, which the caller
/// computes per request.
pub fn render_index(locale: Locale, range: DateRange) -> String {
    let labels = labels(locale);
    let options: String = Ticker::all()
        .map(|t| {
            let selected = if t.as_str() == DEFAULT_TICKER {
                " selected"
            } else {
                ""
            };
            format!(r#"<option value="{t}"{selected}>{t}</option>"#)
        })
        .collect::<Vec<_>>()
        .join("\n          ");

    TEMPLATE
        .replace("{{LANG}}", lang(locale))
        .replace("{{TITLE}}", locale.page_title())
        .replace("{{TICKER_LABEL}}", labels.ticker)
        .replace("{{TICKER_OPTIONS}}", &options)
        .replace("{{RANGE_LABEL}}", labels.range)
        .replace("{{MIN_DATE}}", &MIN_START_DATE.to_string())
        .replace("{{START_DATE}}", &range.start.to_string())
        .replace("{{END_DATE}}", &range.end.to_string())
        .replace("{{DOWNLOAD_LABEL}}", labels.download)
        .replace("{{MORE_CHARTS}}", labels.more_charts)
}

fn lang(locale: Locale) -> &'static str {
    match locale {
        Locale::Uk => "uk",
        Locale::En => "en",
    }
}
