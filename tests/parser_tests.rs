//! Output parser fixtures.

use walrus_deploy_rs::parser::{parse_object_id, parse_resources, parse_urls};
use walrus_deploy_rs::{extract_json, strip_ansi, OutputParser, TextOutputParser};

const HEX: &str = "5ac988828a0c9842d91e6d5bdd9552ec9fcdddf11c56bf82dff6349af0c8c2ff";

#[test]
fn ansi_prefixed_json_is_recovered() {
    let raw = "\x1b[32mINFO\x1b[0m {\"a\":1}";
    let json = extract_json(raw).unwrap();
    assert_eq!(json, "{\"a\":1}");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["a"], 1);
}

#[test]
fn pure_json_is_unchanged() {
    let raw = r#"[{"mistBalance":1}]"#;
    assert_eq!(extract_json(raw).unwrap(), raw);
}

#[test]
fn new_site_object_id_is_recovered() {
    let text = format!("Parsing the directory...\nNew site object ID: 0x{}\n", HEX);
    let id = parse_object_id(&text).unwrap();
    assert_eq!(id.as_str(), format!("0x{}", HEX));
}

#[test]
fn latest_object_id_wins() {
    let older = "1".repeat(64);
    let text = format!("Site object ID: 0x{}\nNew site object ID: 0x{}\n", older, HEX);
    assert_eq!(parse_object_id(&text).unwrap().as_str(), format!("0x{}", HEX));
}

#[test]
fn short_hex_is_not_an_object_id() {
    assert!(parse_object_id("New site object ID: 0xabc").is_none());
}

#[test]
fn urls_recovered_with_punctuation_trimmed() {
    let text = "Browse the resulting site at: https://one.wal.app.\n\
                Or locally (http://localhost:3000/site), and also https://two.example/path?x=1;\n\
                duplicate https://one.wal.app!";
    assert_eq!(
        parse_urls(text),
        vec![
            "https://one.wal.app",
            "http://localhost:3000/site",
            "https://two.example/path?x=1",
        ]
    );
}

#[test]
fn resources_from_sitemap_listing() {
    let text = "\
Pages in site at object id: 0xabc
  Created resource /index.html with blob ID 4ZcB8mK1
  Created resource /assets/app.js with blob ID Qx-9_z
unrelated line
";
    let resources = parse_resources(text);
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].path, "/index.html");
    assert_eq!(resources[0].blob_id, "4ZcB8mK1");
    assert_eq!(resources[1].path, "/assets/app.js");
    assert_eq!(resources[1].blob_id, "Qx-9_z");
}

#[test]
fn full_publish_output() {
    let raw = format!(
        "\x1b[1mOperations performed:\x1b[0m\n\
         Created resource /index.html with blob ID AAA\n\
         \n\
         \x1b[32mNew site object ID: 0x{}\x1b[0m\n\
         To browse the site, visit https://site.localhost:3000.\n",
        HEX.to_uppercase()
    );
    let out = TextOutputParser.parse(&raw);
    assert_eq!(out.object_id, format!("0x{}", HEX));
    assert!(out.base36_id.is_some());
    assert_eq!(out.site_url, "https://site.localhost:3000");
    assert_eq!(out.resources.len(), 1);
    assert!(!out.success);
}

#[test]
fn unrecognised_output_yields_empty_fields() {
    let out = TextOutputParser.parse("nothing useful here\n\x1b[31merror\x1b[0m");
    assert!(out.object_id.is_empty());
    assert!(out.site_url.is_empty());
    assert!(out.browse_urls.is_empty());
    assert!(out.resources.is_empty());
    assert!(out.base36_id.is_none());
}

#[test]
fn strip_ansi_leaves_plain_text() {
    assert_eq!(strip_ansi("plain"), "plain");
    assert_eq!(strip_ansi("\x1b[1;31mred\x1b[0m"), "red");
}
