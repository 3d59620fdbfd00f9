use scraper::{Html, Selector};

const TITLE_SELECTOR: &str = "title";
/// First info article on the ministry page.
const ARTICLE_SELECTOR: &str = "article div.row div.col-md-12 p span";

/// The two pieces of the page the extractor reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageText {
    pub title: String,
    pub body: String,
}

pub fn parse_page(html: &str) -> PageText {
    let document = Html::parse_document(html);
    PageText {
        title: first_text(&document, TITLE_SELECTOR),
        body: first_text(&document, ARTICLE_SELECTOR),
    }
}

fn first_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
}
