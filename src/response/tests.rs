use anyhow::{Result, bail};

use super::*;

fn menu_table(rows: &[(&str, &str)]) -> String {
    let cells = rows
        .iter()
        .map(|(label, value)| format!("<tr><td>{label}</td><td>{value}</td></tr>"))
        .collect::<String>();
    format!(r#"<table class="menu-tbl"><tbody>{cells}</tbody></table>"#)
}

fn mcq_block(identity: &str, options: &[(&str, &str)]) -> String {
    let option_rows = options
        .iter()
        .map(|(marker, file)| {
            format!(r#"<tr><td>{marker} <img src="/per/g25/{file}"></td></tr>"#)
        })
        .collect::<String>();
    format!(
        r#"<table class="questionPnlTbl"><tbody><tr><td>
<table class="questionRowTbl"><tbody>
<tr><td>Q.1</td><td><img src="/per/g25/{identity}"></td></tr>
{option_rows}
</tbody></table>
</td></tr></tbody></table>"#
    )
}

fn page(body: &str) -> String {
    format!("<html><body><div class=\"grp-cntnr\">{body}</div></body></html>")
}

#[test]
fn parses_identity_status_answer_and_option_shuffle() {
    let html = page(&format!(
        "{}{}",
        mcq_block(
            "GATE2025_cs1q12.png",
            &[
                ("A.", "GATE2025_cs1q12b.png"),
                ("B.", "GATE2025_cs1q12a.png"),
                ("C.", "GATE2025_cs1q12c.png"),
                ("D.", "GATE2025_cs1q12d.png"),
            ],
        ),
        menu_table(&[
            ("Question Type :", "MCQ"),
            ("Question ID :", "6400123"),
            ("Status :", "Answered"),
            ("Chosen Option :", "B"),
        ]),
    ));

    let parser = ResponseSheetParser::new(["CS", "GA"]).unwrap();
    let records = parser.parse(&html);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.master_ref.as_deref(), Some("CS_12"));
    assert_eq!(record.question_id.as_deref(), Some("6400123"));
    assert_eq!(record.status, "Answered");
    assert_eq!(record.user_answer.as_deref(), Some("B"));
    assert_eq!(record.option_map.get(&'A'), Some(&'b'));
    assert_eq!(record.option_map.get(&'B'), Some(&'a'));
    assert_eq!(record.option_map.len(), 4);
}

#[test]
fn nat_answer_falls_back_to_row_table() {
    let block = r#"<table class="questionPnlTbl"><tbody><tr><td>
<table class="questionRowTbl"><tbody>
<tr><td>Q.40</td><td><img name="GATE2025_ga1q40.png" src="/x/ignored.png"></td></tr>
<tr><td>Given Answer :</td><td>0.35</td></tr>
</tbody></table>
</td></tr></tbody></table>"#;
    let html = page(&format!(
        "{block}{}",
        menu_table(&[("Question ID :", "1"), ("Status :", "Answered")])
    ));

    let parser = ResponseSheetParser::new(["GA"]).unwrap();
    let records = parser.parse(&html);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].master_ref.as_deref(), Some("GA_40"));
    assert_eq!(records[0].user_answer.as_deref(), Some("0.35"));
    assert!(records[0].option_map.is_empty());
}

#[test]
fn dashes_and_blank_answers_are_absent() {
    let html = page(&format!(
        "{}{}{}{}",
        mcq_block("GATE2025_ga1q1.png", &[]),
        menu_table(&[("Status :", "Not Answered"), ("Chosen Option :", "--")]),
        mcq_block("GATE2025_ga1q2.png", &[]),
        menu_table(&[("Status :", "Not Answered"), ("Chosen Option :", " ")]),
    ));

    let parser = ResponseSheetParser::new(["GA"]).unwrap();
    let records = parser.parse(&html);

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.user_answer.is_none()));
    assert_eq!(records[1].master_ref.as_deref(), Some("GA_2"));
}

#[test]
fn blocks_without_identity_are_dropped() {
    let html = page(&format!(
        "{}{}{}{}",
        mcq_block("banner.png", &[]),
        menu_table(&[("Status :", "Answered"), ("Chosen Option :", "A")]),
        mcq_block("GATE2025_me2q7.png", &[]),
        menu_table(&[("Status :", "Answered"), ("Chosen Option :", "C")]),
    ));

    let parser = ResponseSheetParser::new(["GA", "ME"]).unwrap();
    let records = parser.parse(&html);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].master_ref.as_deref(), Some("ME_7"));
    assert_eq!(records[0].user_answer.as_deref(), Some("C"));
}

#[test]
fn first_identity_match_wins() {
    let block = r#"<table class="questionPnlTbl"><tbody>
<tr><td><img src="/a/GATE2025_ga1q03.png"></td></tr>
<tr><td><img src="/a/GATE2025_cs1q44.png"></td></tr>
<tr><td><img src="/a/x_cs1q5_ga1q6.png"></td></tr>
</tbody></table>"#;
    let parser = ResponseSheetParser::new(["CS", "GA"]).unwrap();

    let records = parser.parse(&page(block));
    assert_eq!(records[0].master_ref.as_deref(), Some("GA_3"));

    let ambiguous = r#"<table class="questionPnlTbl"><tbody>
<tr><td><img src="/a/x_ga1q6_cs1q5.png"></td></tr>
</tbody></table>"#;
    let records = parser.parse(&page(ambiguous));
    assert_eq!(records[0].master_ref.as_deref(), Some("CS_5"));
}

#[test]
fn option_images_never_set_identity() {
    let html = page(&format!(
        "{}{}",
        mcq_block(
            "logo.png",
            &[("(A)", "GATE2025_cs1q9a.png"), ("(B)", "GATE2025_cs1q9x.png")],
        ),
        menu_table(&[("Status :", "Answered")]),
    ));

    let parser = ResponseSheetParser::new(["CS"]).unwrap();
    assert!(parser.parse(&html).is_empty());
}

#[test]
fn parenthesized_markers_and_invalid_suffixes() {
    let html = page(&format!(
        "{}{}",
        mcq_block(
            "GATE2025_cs2q9.png",
            &[
                ("(A)", "GATE2025_cs2q9D.png"),
                ("(B)", "GATE2025_cs2q9x.png"),
                ("C.", "GATE2025_cs2q9a.jpeg"),
            ],
        ),
        menu_table(&[("Status :", "Marked For Review"), ("Chosen Option :", "A")]),
    ));

    let parser = ResponseSheetParser::new(["CS"]).unwrap();
    let records = parser.parse(&html);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.master_ref.as_deref(), Some("CS_9"));
    assert_eq!(record.option_map.get(&'A'), Some(&'d'));
    assert_eq!(record.option_map.get(&'B'), None);
    assert_eq!(record.option_map.get(&'C'), Some(&'a'));
}

#[test]
fn later_menu_answer_label_wins() {
    let html = page(&format!(
        "{}{}",
        mcq_block("GATE2025_ga1q4.png", &[]),
        menu_table(&[("Chosen Option :", "A"), ("Given Answer :", "B")]),
    ));

    let parser = ResponseSheetParser::new(["GA"]).unwrap();
    assert_eq!(parser.parse(&html)[0].user_answer.as_deref(), Some("B"));
}

struct StubFetcher;

impl ResponseFetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        if url.contains("missing") {
            bail!("404 Not Found for {url}");
        }
        Ok(format!("<html><!-- {url} --></html>"))
    }
}

#[test]
fn response_source_resolves_html_and_urls() {
    let inline = ResponseSource::Html("<html></html>".to_string());
    assert_eq!(inline.into_html(&StubFetcher).unwrap(), "<html></html>");

    let remote = ResponseSource::Url("https://cdn.example/sheet.html".to_string());
    assert!(remote.into_html(&StubFetcher).unwrap().contains("sheet.html"));

    let missing = ResponseSource::Url("https://cdn.example/missing.html".to_string());
    assert!(missing.into_html(&StubFetcher).is_err());

    assert!(ResponseSource::is_url("https://cdn.example/a.html"));
    assert!(!ResponseSource::is_url("responses/a.html"));
}
