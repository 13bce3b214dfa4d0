use bazi::chart::{META_ERROR, META_GZ_DAY, META_GZ_HOUR, META_GZ_MONTH, META_GZ_YEAR, META_JIE_QI, META_LUNAR_YMD, META_SOLAR_YMD};
use bazi::{resolve_pillars, BirthMoment, PillarResolver, ZodiacAnimal};

#[test]
fn test_taipei_afternoon_chart() {
    let birth = BirthMoment::parse("2023-08-15T10:00:00", "Asia/Taipei").unwrap();
    let chart = resolve_pillars(&birth);

    assert!(!chart.has_unknown_pillar());
    assert_eq!(chart.year.to_string(), "癸卯");
    assert_eq!(chart.month.to_string(), "庚申");
    assert_eq!(chart.day.to_string(), "乙巳");
    assert_eq!(chart.hour.map(|p| p.to_string()).as_deref(), Some("辛巳"));
    assert_eq!(chart.zodiac_animal, Some(ZodiacAnimal::Rabbit));

    // 立秋 (Aug 8) is nearer than 處暑 (Aug 23)
    assert_eq!(chart.solar_term.map(|t| t.name()), Some("立秋"));

    for key in [META_GZ_YEAR, META_GZ_MONTH, META_GZ_DAY, META_GZ_HOUR, META_LUNAR_YMD, META_SOLAR_YMD, META_JIE_QI] {
        assert!(chart.metadata.contains_key(key), "missing {}", key);
    }
    assert_eq!(chart.metadata[META_GZ_YEAR], "癸卯");
    assert_eq!(chart.metadata[META_SOLAR_YMD], "2023-8-15");
    assert_eq!(chart.metadata[META_LUNAR_YMD], "2023-6-29");
}

#[test]
fn test_zodiac_turns_at_lunar_new_year() {
    let eve = resolve_pillars(&BirthMoment::parse("2024-02-09T12:00", "Asia/Taipei").unwrap());
    let first = resolve_pillars(&BirthMoment::parse("2024-02-10T12:00", "Asia/Taipei").unwrap());
    assert_eq!(eve.zodiac_animal, Some(ZodiacAnimal::Rabbit));
    assert_eq!(first.zodiac_animal, Some(ZodiacAnimal::Dragon));
    assert_ne!(eve.zodiac_animal, first.zodiac_animal);
    assert_eq!(eve.year.to_string(), "癸卯");
    assert_eq!(first.year.to_string(), "甲辰");
    // both after 立春, so the month is 丙寅 either way
    assert_eq!(eve.month.to_string(), "丙寅");
    assert_eq!(first.month.to_string(), "丙寅");
}

#[test]
fn test_solar_term_on_the_day() {
    let chart = resolve_pillars(&BirthMoment::parse("2024-04-04T08:00", "Asia/Taipei").unwrap());
    assert_eq!(chart.solar_term.map(|t| t.name()), Some("清明"));
    assert_eq!(chart.metadata[META_JIE_QI], "清明");
}

#[test]
fn test_early_years_resolve() {
    let chart = resolve_pillars(&BirthMoment::parse("0900-05-01T12:00", "Asia/Taipei").unwrap());
    assert!(!chart.has_unknown_pillar());
    assert_eq!(chart.year.to_string(), "庚申");
    assert_eq!(chart.zodiac_animal, Some(ZodiacAnimal::Monkey));
    assert!(!chart.metadata.contains_key(META_ERROR));

    let first = resolve_pillars(&BirthMoment::parse("0001-06-01T12:00", "Asia/Taipei").unwrap());
    assert!(!first.has_unknown_pillar());
    assert_eq!(first.year.to_string(), "辛酉");
    assert_eq!(first.zodiac_animal, Some(ZodiacAnimal::Rooster));
    assert!(first.solar_term.is_some());
}

#[test]
fn test_year_9999_with_ephemeris_files() {
    // past the built-in theory; runs only when SE_EPHE_PATH holds the data files
    if std::env::var_os("SE_EPHE_PATH").is_none() {
        return;
    }
    let chart = PillarResolver::new().resolve(&BirthMoment::parse("9999-06-01T12:00", "Asia/Taipei").unwrap());
    assert!(!chart.has_unknown_pillar());
    assert_eq!(chart.year.to_string(), "己亥");
}

#[test]
fn test_chart_json_shape() {
    let chart = resolve_pillars(&BirthMoment::parse("2023-08-15T10:00", "Asia/Taipei").unwrap());
    let value = serde_json::to_value(&chart).unwrap();
    assert!(value.get("zodiacAnimal").is_some());
    assert!(value.get("solarTerm").is_some());
    assert_eq!(value["solarTerm"], "立秋");
}
