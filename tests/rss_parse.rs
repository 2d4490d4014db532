// tests/rss_parse.rs
use chrono::{TimeZone, Utc};
use cyber_good_news::ingest::rss::parse_feed;
use cyber_good_news::ingest::story_id;
use cyber_good_news::scoring::RuleSet;

const RSS_XML: &str = include_str!("fixtures/security_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/research_atom.xml");

#[test]
fn rss_fixture_yields_linked_items_only() {
    let now = Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap();
    let stories = parse_feed(RSS_XML, "Security News", now).expect("rss parses");
    assert_eq!(stories.len(), 2, "entry without link must be skipped");

    let first = &stories[0];
    assert_eq!(first.title, "Europol dismantled & seized botnet infrastructure");
    assert_eq!(
        first.description,
        "Police dismantled the botnet and seized 40 servers."
    );
    assert_eq!(first.source, "Security News");
    assert_eq!(first.source_url, "https://news.example.com/botnet-dismantled");
    assert_eq!(
        first.id.as_deref(),
        Some(story_id("https://news.example.com/botnet-dismantled").as_str())
    );
    assert_eq!(
        first.published_date,
        Utc.with_ymd_and_hms(2025, 6, 10, 14, 30, 0).unwrap()
    );
    assert_eq!(first.collected_date, now);
    assert_eq!(first.category, "Uncategorized");
    assert_eq!(first.impact_score, 0.0);
    assert!(!first.is_processed && !first.is_sent);

    // unparseable pubDate falls back to the collection time
    assert_eq!(stories[1].published_date, now);
}

#[test]
fn atom_fixture_prefers_alternate_link() {
    let now = Utc::now();
    let stories = parse_feed(ATOM_XML, "Research Blog", now).expect("atom parses");
    assert_eq!(stories.len(), 2);

    assert_eq!(
        stories[0].source_url,
        "https://research.example.org/posts/firmware-tool"
    );
    assert_eq!(
        stories[0].description,
        "Researchers released a new tool for firmware analysis."
    );
    assert_eq!(
        stories[0].published_date,
        Utc.with_ymd_and_hms(2025, 6, 11, 8, 0, 0).unwrap()
    );

    // no `published`: `updated` is used, offset normalised to UTC
    assert_eq!(
        stories[1].published_date,
        Utc.with_ymd_and_hms(2025, 6, 10, 6, 0, 0).unwrap()
    );
    assert!(stories[1].description.contains("refreshed"));
    assert!(!stories[1].description.contains('<'));
}

#[test]
fn parsed_fixture_scores_end_to_end() {
    let mut stories = parse_feed(RSS_XML, "Security News", Utc::now()).unwrap();
    let rules = RuleSet::builtin();
    for s in stories.iter_mut() {
        cyber_good_news::scoring::analyze_story(s, &rules).unwrap();
    }
    assert_eq!(stories[0].category, "Security Wins");
    assert!(stories[0].impact_score >= 7.0);
    assert_eq!(stories[1].category, "Neutral");
}

#[test]
fn ids_are_stable_per_link() {
    let a = story_id("https://news.example.com/a");
    assert_eq!(a.len(), 32);
    assert_eq!(a, story_id(" https://news.example.com/a "));
    assert_ne!(a, story_id("https://news.example.com/b"));
}
