//! Record extraction from one rendered listing page.
//!
//! The page interleaves, per company: a name link, a one-line summary
//! block (price / market cap / P/E), then a four-row metrics table.
//! Nothing structurally ties the three together, so the page is
//! flattened into a document-order sequence of typed nodes and each
//! table is associated with the nearest preceding name and summary.
//! That adjacency assumption comes from the upstream markup and has no
//! fallback; a table where it does not hold is skipped, never guessed at.

use crate::models::CompanyRecord;
use crate::scraper::cleaner::{parse_numeric, parse_yoy};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Body rows required per table: Sales, EBIDT, NetProfit, EPS, in that
/// fixed order. Tables with fewer are skipped whole; extra rows are
/// ignored rather than given invented meaning.
const METRIC_ROWS: usize = 4;

/// Summary figures rendered just above each company's table.
#[derive(Debug, Clone, Default, PartialEq)]
struct Summary {
    price: Option<f64>,
    market_cap: Option<f64>,
    pe: Option<f64>,
}

/// One structural node of the page, in document order.
#[derive(Debug)]
enum PageNode {
    CompanyName(String),
    Summary(Summary),
    /// Table body rows as trimmed cell text.
    MetricsTable(Vec<Vec<String>>),
}

struct Selectors {
    span: Selector,
    sub: Selector,
    strong: Selector,
    body_row: Selector,
    cell: Selector,
}

impl Selectors {
    fn new() -> Option<Self> {
        Some(Self {
            span: Selector::parse("span").ok()?,
            sub: Selector::parse("span.sub").ok()?,
            strong: Selector::parse("span.strong").ok()?,
            body_row: Selector::parse("tbody tr").ok()?,
            cell: Selector::parse("td").ok()?,
        })
    }
}

/// Extract every company record from one page's markup.
///
/// Zero records is a valid outcome, not an error; a malformed single
/// company never aborts the rest of the page.
pub fn parse_results_page(html: &str) -> Vec<CompanyRecord> {
    let Some(selectors) = Selectors::new() else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let nodes = collect_page_nodes(&doc, &selectors);
    associate(nodes)
}

// ── Structural scan ───────────────────────────────────────────────────────────

fn has_class(el: &ElementRef, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn collect_page_nodes(doc: &Html, selectors: &Selectors) -> Vec<PageNode> {
    let mut nodes = Vec::new();

    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };

        match el.value().name() {
            "a" if has_class(&el, "font-weight-500") => {
                let name = el.select(&selectors.span).next().map(|s| text_of(&s));
                if let Some(name) = name.filter(|n| !n.is_empty()) {
                    nodes.push(PageNode::CompanyName(name));
                }
            }
            "div" if has_class(&el, "font-size-14") => {
                nodes.push(PageNode::Summary(parse_summary(&el, selectors)));
            }
            "table" if has_class(&el, "data-table") => {
                let rows = el
                    .select(&selectors.body_row)
                    .map(|tr| tr.select(&selectors.cell).map(|td| text_of(&td)).collect())
                    .collect();
                nodes.push(PageNode::MetricsTable(rows));
            }
            _ => {}
        }
    }

    nodes
}

/// Read Price / M.Cap / PE out of a summary block. Labels live in the
/// `span.sub` text, values in a nested `span.strong`.
fn parse_summary(el: &ElementRef, selectors: &Selectors) -> Summary {
    let mut summary = Summary::default();

    for sub in el.select(&selectors.sub) {
        let label: String = sub.text().collect();
        let value = sub
            .select(&selectors.strong)
            .next()
            .and_then(|s| parse_numeric(&text_of(&s)));

        if label.contains("Price") {
            summary.price = value;
        } else if label.contains("M.Cap") {
            summary.market_cap = value;
        } else if label.contains("PE") {
            summary.pe = value;
        }
    }

    summary
}

// ── Association ───────────────────────────────────────────────────────────────

/// Nearest-preceding-match scan: each table picks up the last company
/// name and summary block seen before it.
fn associate(nodes: Vec<PageNode>) -> Vec<CompanyRecord> {
    let mut company: Option<String> = None;
    let mut summary: Option<Summary> = None;
    let mut records = Vec::new();

    for node in nodes {
        match node {
            PageNode::CompanyName(name) => company = Some(name),
            PageNode::Summary(s) => summary = Some(s),
            PageNode::MetricsTable(rows) => {
                match build_record(company.as_deref(), summary.as_ref(), &rows) {
                    Some(record) => records.push(record),
                    None => debug!(
                        "skipping table near {:?}: unusable shape ({} rows)",
                        company,
                        rows.len()
                    ),
                }
            }
        }
    }

    records
}

/// The four periodised values of one metric row.
struct MetricCells {
    yoy: Option<f64>,
    latest: Option<f64>,
    prior_qtr: Option<f64>,
    year_ago: Option<f64>,
}

/// Cell 1 is the YOY glyph text, cells 2 and 3 the two most recent
/// periods; cell 4 is missing on some layouts and then the third period
/// is simply absent. A row too short to carry even the first three data
/// cells makes the whole table unusable.
fn metric_cells(cells: &[String]) -> Option<MetricCells> {
    if cells.len() < 4 {
        return None;
    }
    Some(MetricCells {
        yoy: parse_yoy(&cells[1]),
        latest: parse_numeric(&cells[2]),
        prior_qtr: parse_numeric(&cells[3]),
        year_ago: cells.get(4).and_then(|c| parse_numeric(c)),
    })
}

fn build_record(
    company: Option<&str>,
    summary: Option<&Summary>,
    rows: &[Vec<String>],
) -> Option<CompanyRecord> {
    // A record without a company name would be unattributable.
    let company = company?.to_string();
    if rows.len() < METRIC_ROWS {
        return None;
    }

    let summary = summary.cloned().unwrap_or_default();
    let sales = metric_cells(&rows[0])?;
    let ebidt = metric_cells(&rows[1])?;
    let net_profit = metric_cells(&rows[2])?;
    let eps = metric_cells(&rows[3])?;

    Some(CompanyRecord {
        company,
        price: summary.price,
        market_cap: summary.market_cap,
        pe: summary.pe,

        sales_yoy: sales.yoy,
        sales_latest: sales.latest,
        sales_prior_qtr: sales.prior_qtr,
        sales_year_ago: sales.year_ago,

        ebidt_yoy: ebidt.yoy,
        ebidt_latest: ebidt.latest,
        ebidt_prior_qtr: ebidt.prior_qtr,
        ebidt_year_ago: ebidt.year_ago,

        net_profit_yoy: net_profit.yoy,
        net_profit_latest: net_profit.latest,
        net_profit_prior_qtr: net_profit.prior_qtr,
        net_profit_year_ago: net_profit.year_ago,

        eps_yoy: eps.yoy,
        eps_latest: eps.latest,
        eps_prior_qtr: eps.prior_qtr,
        eps_year_ago: eps.year_ago,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company_block(name: &str, price: &str, table_rows: &str) -> String {
        format!(
            r#"
            <a class="font-weight-500" href="/company/x/"><span>{name}</span></a>
            <div class="font-size-14">
              <span class="sub">Price: <span class="strong">{price}</span></span>
              <span class="sub">M.Cap: <span class="strong">5,678</span></span>
              <span class="sub">PE: <span class="strong">21.4</span></span>
            </div>
            <table class="data-table"><tbody>{table_rows}</tbody></table>
            "#
        )
    }

    const FULL_ROWS: &str = r#"
        <tr><td>Sales</td><td>⇡12%</td><td>100.5</td><td>95.0</td><td>89.7</td></tr>
        <tr><td>EBIDT</td><td>⇣7%</td><td>20.1</td><td>22.0</td><td>21.6</td></tr>
        <tr><td>Net Profit</td><td>⇡3%</td><td>10.0</td><td>9.1</td><td></td></tr>
        <tr><td>EPS</td><td></td><td>1.2</td><td>1.1</td><td>1.15</td></tr>
    "#;

    #[test]
    fn extracts_a_full_company_block() {
        let html = format!("<html><body>{}</body></html>", company_block("Alpha Industries", "₹1,234.50", FULL_ROWS));
        let records = parse_results_page(&html);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.company, "Alpha Industries");
        assert_eq!(r.price, Some(1234.50));
        assert_eq!(r.market_cap, Some(5678.0));
        assert_eq!(r.pe, Some(21.4));
        assert_eq!(r.sales_yoy, Some(12.0));
        assert_eq!(r.sales_latest, Some(100.5));
        assert_eq!(r.sales_prior_qtr, Some(95.0));
        assert_eq!(r.sales_year_ago, Some(89.7));
        assert_eq!(r.ebidt_yoy, Some(-7.0));
        // Empty trailing cell: absent, not zero.
        assert_eq!(r.net_profit_year_ago, None);
        // Empty YOY cell: absent.
        assert_eq!(r.eps_yoy, None);
        assert_eq!(r.eps_year_ago, Some(1.15));
    }

    #[test]
    fn missing_fourth_data_cell_is_absent() {
        let rows = r#"
            <tr><td>Sales</td><td>⇡5%</td><td>10</td><td>9</td></tr>
            <tr><td>EBIDT</td><td>⇡5%</td><td>10</td><td>9</td></tr>
            <tr><td>Net Profit</td><td>⇡5%</td><td>10</td><td>9</td></tr>
            <tr><td>EPS</td><td>⇡5%</td><td>10</td><td>9</td></tr>
        "#;
        let html = company_block("Beta Ltd", "10", rows);
        let records = parse_results_page(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sales_year_ago, None);
        assert_eq!(records[0].sales_prior_qtr, Some(9.0));
    }

    #[test]
    fn page_without_tables_yields_no_records() {
        let records = parse_results_page("<html><body><p>Please log in</p></body></html>");
        assert!(records.is_empty());
    }

    #[test]
    fn short_table_is_skipped_but_siblings_survive() {
        let short_rows = r#"
            <tr><td>Sales</td><td>⇡5%</td><td>10</td><td>9</td></tr>
            <tr><td>EBIDT</td><td>⇡5%</td><td>10</td><td>9</td></tr>
        "#;
        let html = format!(
            "{}{}",
            company_block("Broken Corp", "10", short_rows),
            company_block("Gamma Ltd", "42", FULL_ROWS)
        );
        let records = parse_results_page(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company, "Gamma Ltd");
        assert_eq!(records[0].price, Some(42.0));
    }

    #[test]
    fn table_without_preceding_company_name_is_skipped() {
        let html = format!(
            r#"<table class="data-table"><tbody>{}</tbody></table>"#,
            FULL_ROWS
        );
        assert!(parse_results_page(&html).is_empty());
    }

    #[test]
    fn missing_summary_block_still_yields_a_record() {
        let html = format!(
            r#"
            <a class="font-weight-500"><span>Delta Ltd</span></a>
            <table class="data-table"><tbody>{}</tbody></table>
            "#,
            FULL_ROWS
        );
        let records = parse_results_page(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].company, "Delta Ltd");
        assert_eq!(records[0].price, None);
        assert_eq!(records[0].sales_latest, Some(100.5));
    }

    #[test]
    fn each_table_binds_to_its_nearest_preceding_block() {
        let html = format!(
            "{}{}",
            company_block("First Co", "1", FULL_ROWS),
            company_block("Second Co", "2", FULL_ROWS)
        );
        let records = parse_results_page(&html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, "First Co");
        assert_eq!(records[0].price, Some(1.0));
        assert_eq!(records[1].company, "Second Co");
        assert_eq!(records[1].price, Some(2.0));
    }

    #[test]
    fn row_with_too_few_cells_drops_the_table() {
        let rows = r#"
            <tr><td>Sales</td><td>⇡5%</td></tr>
            <tr><td>EBIDT</td><td>⇡5%</td><td>10</td><td>9</td></tr>
            <tr><td>Net Profit</td><td>⇡5%</td><td>10</td><td>9</td></tr>
            <tr><td>EPS</td><td>⇡5%</td><td>10</td><td>9</td></tr>
        "#;
        let html = company_block("Epsilon", "10", rows);
        assert!(parse_results_page(&html).is_empty());
    }
}
