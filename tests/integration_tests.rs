//! Integration tests for sostenuto
//!
//! Tests whole segments built through the public API, and metadata handed
//! from one segment to the next.

use sostenuto::*;

fn cello(notation: &str) -> Score {
    let mut score = Score::new();
    score
        .add_voice("Cello_Staff", "Cello_Voice", notation)
        .unwrap();
    score
}

fn wrappers_of<'a>(score: &'a Score, type_name: &str) -> Vec<&'a Wrapper> {
    score
        .wrappers()
        .iter()
        .filter(|w| w.indicator.type_name() == type_name)
        .collect()
}

#[test]
fn test_metadata_chains_between_segments() {
    let mut first = cello("c4 d e f");
    let runtime = Runtime::for_score(&first);
    let nodes: Vec<Node> = vec![clef("bass").unwrap().into(), dynamic("p").unwrap().into()];
    let metadata = build_segment(&mut first, &nodes, &runtime).unwrap();

    // metadata travels as YAML between segments
    let yaml = metadata.to_yaml().unwrap();
    let carried = SegmentMetadata::from_yaml(&yaml).unwrap();
    assert_eq!(carried, metadata);

    let mut second = cello("g4 a b c'");
    let runtime = Runtime::for_score(&second).with_previous_metadata(carried);
    let metadata = build_segment(&mut second, &[], &runtime).unwrap();

    let reapplied: Vec<String> = second
        .wrappers()
        .iter()
        .filter(|w| w.status == Some(IndicatorStatus::Reapplied))
        .map(|w| w.full_tag().to_string())
        .collect();
    assert_eq!(reapplied, vec!["REAPPLIED_CLEF", "REAPPLIED_DYNAMIC"]);
    assert_eq!(metadata.persistent_indicators["Cello_Staff"][0].value, "bass");
    assert_eq!(metadata.persistent_indicators["Cello_Voice"][0].value, "p");
}

#[test]
fn test_restating_carried_clef_is_redundant() {
    let mut score = cello("c4 d");
    let mut previous = SegmentMetadata::default();
    previous.persistent_indicators.insert(
        "Cello_Staff".to_string(),
        vec![Momento {
            context: "Cello_Staff".to_string(),
            kind: IndicatorKind::Clef,
            value: "bass".to_string(),
            manifest: None,
            edition: None,
        }],
    );
    let runtime = Runtime::for_score(&score).with_previous_metadata(previous);
    build_segment(&mut score, &[Node::from(clef("bass").unwrap())], &runtime).unwrap();

    let clefs = wrappers_of(&score, "Clef");
    assert_eq!(clefs.len(), 1);
    assert!(!clefs[0].synthetic);
    assert_eq!(clefs[0].full_tag().to_string(), "clef:REDUNDANT_CLEF");
    assert_eq!(clefs[0].color(), Some("DeepPink1"));
}

#[test]
fn test_template_defaults_apply_to_first_leaf() {
    let config = Config::from_yaml(
        r#"
defaults:
  Cello_Staff:
    clef: bass
    instrument: cello
  Score:
    metronome_mark: "4=72"
instruments:
  cello: { name: Cello, short_name: Vc., type: cello }
"#,
    )
    .unwrap();
    let mut score = cello("c4 d");
    let runtime = Runtime::for_score(&score).with_config(config);
    let metadata = build_segment(&mut score, &[], &runtime).unwrap();

    assert_eq!(status_counts(&score).get("DEFAULT"), Some(&3));
    let staff = &metadata.persistent_indicators["Cello_Staff"];
    let instrument = staff
        .iter()
        .find(|m| m.kind == IndicatorKind::Instrument)
        .unwrap();
    assert_eq!(instrument.value, "Cello");
    assert_eq!(instrument.manifest.as_deref(), Some("instruments"));
    assert_eq!(metadata.persistent_indicators["Score"][0].value, "4=72");
}

#[test]
fn test_text_spanner_over_whole_selection_carries_right_text() {
    let mut score = cello("c4 d e f");
    let runtime = Runtime::for_score(&score);
    let command = text_spanner(
        "pont. => ord.",
        &TextSpannerOptions::default(),
        PiecewiseOptions::default(),
    )
    .unwrap();
    build_segment(&mut score, &[Node::from(command)], &runtime).unwrap();

    let starts = wrappers_of(&score, "StartTextSpan");
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].tag.to_string(), "text_spanner(1)");
    match &starts[0].indicator {
        Indicator::StartTextSpan(start) => {
            assert_eq!(start.left_text, Some(Markup::Text("pont.".to_string())));
            assert_eq!(start.right_text, Some(Markup::Text("ord.".to_string())));
            assert_eq!(start.style, TextSpanStyle::DashedLineWithArrow);
        }
        other => panic!("Expected StartTextSpan but got: {:?}", other),
    }
    let stops = wrappers_of(&score, "StopTextSpan");
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].leaf, LeafId(3));
}

#[test]
fn test_text_spanner_over_runs() {
    let mut score = cello("c4 d r e f g");
    let runtime = Runtime::for_score(&score);
    let command = text_spanner(
        "pont. => ord.",
        &TextSpannerOptions::default(),
        PiecewiseOptions::default(),
    )
    .unwrap()
    .with_selector(Selector::runs());
    build_segment(&mut score, &[Node::from(command)], &runtime).unwrap();

    let starts: Vec<LeafId> = wrappers_of(&score, "StartTextSpan")
        .iter()
        .map(|w| w.leaf)
        .collect();
    let stops: Vec<LeafId> = wrappers_of(&score, "StopTextSpan")
        .iter()
        .map(|w| w.leaf)
        .collect();
    assert_eq!(starts, vec![LeafId(0), LeafId(3)]);
    assert_eq!(stops, vec![LeafId(3), LeafId(5)]);
    assert!(wrappers_of(&score, "StartTextSpan")
        .iter()
        .all(|w| w.leaf != LeafId(2)));
}

#[test]
fn test_tagged_map_over_runs() {
    let mut score = cello("c4 d r e f");
    let runtime = Runtime::for_score(&score);
    let map = Map::new(Selector::runs(), vec![dynamic("p").unwrap().into()]);
    let node = tag(&["MUSIC"], map).unwrap();
    build_segment(&mut score, &[node], &runtime).unwrap();

    let dynamics = wrappers_of(&score, "Dynamic");
    assert_eq!(dynamics.len(), 2);
    assert_eq!(dynamics[0].leaf, LeafId(0));
    assert_eq!(dynamics[1].leaf, LeafId(3));
    assert_eq!(dynamics[1].full_tag().to_string(), "dynamic:MUSIC:REDUNDANT_DYNAMIC");
}

#[test]
fn test_hairpins_per_measure_with_measure_tags() {
    let mut score = cello("c'4 d' e' f'");
    score.set_time_signatures(&[TimeSignature::new(2, 4), TimeSignature::new(2, 4)], 1);
    let runtime = Runtime::for_score(&score);
    let command = hairpin("p < f", PiecewiseOptions::default())
        .unwrap()
        .with_measure_number_tag();
    let map = Map::new(Selector::measures(), vec![command.into()]);
    build_segment(&mut score, &[Node::from(map)], &runtime).unwrap();

    let dynamics = wrappers_of(&score, "Dynamic");
    let placed: Vec<(LeafId, String)> = dynamics
        .iter()
        .map(|w| (w.leaf, w.indicator.to_string()))
        .collect();
    assert_eq!(
        placed,
        vec![
            (LeafId(0), "\\p".to_string()),
            (LeafId(1), "\\f".to_string()),
            (LeafId(2), "\\p".to_string()),
            (LeafId(3), "\\f".to_string()),
        ]
    );
    assert!(dynamics[1].tag.contains("MEASURE_1"));
    assert!(dynamics[2].tag.contains("MEASURE_2"));
    assert_eq!(wrappers_of(&score, "StartHairpin").len(), 2);
}

#[test]
fn test_deactivated_commands_leave_no_momentos() {
    let mut score = cello("c4 d");
    let runtime = Runtime::for_score(&score);
    let nodes: Vec<Node> = vec![clef("treble").unwrap().deactivated().into()];
    let metadata = build_segment(&mut score, &nodes, &runtime).unwrap();
    assert!(metadata.persistent_indicators.is_empty());
    assert!(score.wrappers()[0].to_string().ends_with("%@%"));
}

#[test]
fn test_bad_tags_are_rejected() {
    let result = tag(&["bad:word"], clef("bass").unwrap());
    assert!(matches!(result, Err(SostenutoError::TagError { .. })));
    assert!(tag(&[""], Suite::new(Vec::new())).is_err());
}

#[test]
fn test_descriptor_errors_surface_through_factories() {
    let options = PiecewiseOptions::default();
    assert!(matches!(
        hairpin("p < < f", options.clone()),
        Err(SostenutoError::ParseError { .. })
    ));
    assert!(matches!(
        text_spanner("pont.", &TextSpannerOptions::default(), options.clone()),
        Err(SostenutoError::NotImplemented(_))
    ));
    let options = TextSpannerOptions {
        lilypond_id: Some(4),
        boxed: false,
    };
    assert!(matches!(
        text_spanner("A => B", &options, PiecewiseOptions::default()),
        Err(SostenutoError::SpecifierError(_))
    ));
}
