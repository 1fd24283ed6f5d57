use std::io::Write;

use super::*;

fn site(name: &str) -> SiteConfig {
    SiteConfig {
        name: name.to_string(),
        base_url: "https://shotgun.live".to_string(),
        listing_path: "/en/cities/{city}".to_string(),
        city: Some("new-york".to_string()),
        category: None,
        target_date: None,
        entity_prefix: DEFAULT_ENTITY_PREFIX.to_string(),
        card_selectors: vec![],
        genre_keywords: vec![],
        known_venues: vec![],
    }
}

#[test]
fn slug_simple_name() {
    assert_eq!(site("Shotgun NYC").slug(), "shotgun-nyc");
}

#[test]
fn slug_domain_style_name() {
    assert_eq!(site("dice.fm").slug(), "dice-fm");
}

#[test]
fn listing_url_substitutes_scope() {
    assert_eq!(
        site("Shotgun").listing_url(),
        "https://shotgun.live/en/cities/new-york"
    );
}

#[test]
fn listing_url_handles_relative_path_and_trailing_slash() {
    let mut s = site("Dice");
    s.base_url = "https://dice.fm/".to_string();
    s.listing_path = "browse/{city}/music/{category}".to_string();
    s.city = Some("new_york-5bbf4db0f06331478e9b2c59".to_string());
    s.category = Some("party".to_string());
    assert_eq!(
        s.listing_url(),
        "https://dice.fm/browse/new_york-5bbf4db0f06331478e9b2c59/music/party"
    );
}

#[test]
fn find_matches_name_or_slug() {
    let file = SitesFile {
        sites: vec![site("Shotgun NYC"), site("RA")],
    };
    assert_eq!(file.find("Shotgun NYC").map(|s| s.name.as_str()), Some("Shotgun NYC"));
    assert_eq!(file.find("shotgun-nyc").map(|s| s.name.as_str()), Some("Shotgun NYC"));
    assert!(file.find("dice").is_none());
}

#[test]
fn validate_rejects_empty_site_list() {
    let err = validate_sites(&SitesFile { sites: vec![] }).unwrap_err();
    assert!(err.to_string().contains("at least one site"));
}

#[test]
fn validate_rejects_non_http_base_url() {
    let mut s = site("Bad");
    s.base_url = "ftp://example.test".to_string();
    let err = validate_sites(&SitesFile { sites: vec![s] }).unwrap_err();
    assert!(err.to_string().contains("invalid base_url"));
}

#[test]
fn validate_rejects_duplicate_slug() {
    let file = SitesFile {
        sites: vec![site("Shotgun NYC"), site("shotgun nyc")],
    };
    let err = validate_sites(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate site slug"));
}

#[test]
fn load_sites_reads_yaml_with_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
sites:
  - name: Shotgun NYC
    base_url: https://shotgun.live
    listing_path: /en/cities/{{city}}
    city: new-york
    target_date: 2025-12-01
    genre_keywords: [House, Techno]
"#
    )
    .unwrap();

    let sites = load_sites(file.path()).unwrap();
    assert_eq!(sites.sites.len(), 1);
    let s = &sites.sites[0];
    assert_eq!(s.entity_prefix, "Event:");
    assert_eq!(s.target_date, NaiveDate::from_ymd_opt(2025, 12, 1));
    assert_eq!(s.genre_keywords, vec!["House".to_string(), "Techno".to_string()]);
    assert!(s.card_selectors.is_empty());
}

#[test]
fn load_sites_reports_missing_file() {
    let err = load_sites(Path::new("/definitely/not/here/sites.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SitesFileIo { .. }));
}

#[test]
fn repository_sites_file_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("sites.yaml");
    assert!(path.exists(), "sites.yaml missing at {path:?}");

    let sites = load_sites(&path).expect("failed to load sites.yaml");
    assert!(!sites.sites.is_empty());
    let shotgun = sites.find("shotgun").expect("shotgun configured");
    assert_eq!(
        shotgun.listing_url(),
        "https://shotgun.live/en/cities/new-york/techno"
    );
    assert!(shotgun.target_date.is_some());
}
