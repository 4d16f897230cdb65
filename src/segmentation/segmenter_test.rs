use super::*;

fn frag(text: &str, start: f64, duration: f64, confidence: f32) -> Fragment {
    Fragment::new(text, start, duration, confidence)
}

#[test]
fn test_no_boundary_with_fewer_than_two_fragments() {
    let mut segmenter = UtteranceSegmenter::new();
    assert_eq!(segmenter.push(frag("select", 0.0, 0.4, 0.9)), None);
    assert_eq!(segmenter.buffered(), 1);
}

#[test]
fn test_boundary_closes_previous_sentence() {
    // Worked example: a pause of 2.1 - (0.5 + 0.4) = 1.2s before "go"
    // closes "select car"; "go back" stays open.
    let mut segmenter = UtteranceSegmenter::new();
    assert_eq!(segmenter.push(frag("select", 0.0, 0.4, 0.9)), None);
    assert_eq!(segmenter.push(frag("car", 0.5, 0.4, 0.9)), None);

    let utterance = segmenter.push(frag("go", 2.1, 0.3, 0.9));
    assert_eq!(
        utterance,
        Some(Utterance {
            text: "select car".to_string()
        })
    );

    // "back" follows "go" closely, no new boundary
    assert_eq!(segmenter.push(frag("back", 2.5, 0.3, 0.9)), None);
}

#[test]
fn test_gap_below_threshold_never_closes() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("select", 0.0, 0.4, 0.9));
    // gap = 1.39 - 0.4 = 0.99 < 1.0, high confidence is irrelevant
    assert_eq!(segmenter.push(frag("car", 1.39, 0.4, 1.0)), None);
}

#[test]
fn test_gap_at_threshold_closes() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("select", 0.0, 0.5, 0.9));
    // gap = 1.5 - 0.5 = exactly 1.0
    let utterance = segmenter.push(frag("car", 1.5, 0.5, 0.9));
    assert_eq!(
        utterance,
        Some(Utterance {
            text: "select".to_string()
        })
    );
}

#[test]
fn test_zero_confidence_fragment_never_closes() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("select", 0.0, 0.4, 0.9));
    // Large gap but tentative result
    assert_eq!(segmenter.push(frag("car", 3.0, 0.4, 0.0)), None);
    // Once confidence arrives, the boundary is declared
    let utterance = segmenter.push(frag("go", 6.0, 0.3, 0.9));
    assert!(utterance.is_some());
}

#[test]
fn test_words_reassembled_in_chronological_order() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("please", 0.0, 0.2, 0.9));
    segmenter.push(frag("open", 0.3, 0.2, 0.9));
    segmenter.push(frag("the", 0.6, 0.1, 0.9));
    segmenter.push(frag("detail", 0.8, 0.3, 0.9));

    let utterance = segmenter.push(frag("next", 3.0, 0.3, 0.9));
    assert_eq!(
        utterance,
        Some(Utterance {
            text: "please open the detail".to_string()
        })
    );
}

#[test]
fn test_sentence_starts_after_earlier_pause() {
    // Two closed sentences in the buffer: the walk back must stop at the
    // fragment that itself opened after a pause, not at the buffer start.
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("go", 0.0, 0.3, 0.9));
    segmenter.push(frag("back", 0.4, 0.3, 0.9));

    let first = segmenter.push(frag("select", 2.0, 0.4, 0.9));
    assert_eq!(
        first,
        Some(Utterance {
            text: "go back".to_string()
        })
    );

    segmenter.push(frag("car", 2.5, 0.4, 0.9));
    let second = segmenter.push(frag("stop", 4.5, 0.3, 0.9));
    assert_eq!(
        second,
        Some(Utterance {
            text: "select car".to_string()
        })
    );
}

#[test]
fn test_closed_fragments_are_discarded() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("select", 0.0, 0.4, 0.9));
    segmenter.push(frag("car", 0.5, 0.4, 0.9));
    assert_eq!(segmenter.buffered(), 2);

    segmenter.push(frag("go", 2.1, 0.3, 0.9));
    // Only the boundary fragment remains buffered
    assert_eq!(segmenter.buffered(), 1);
}

#[test]
fn test_consecutive_boundaries() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("one", 0.0, 0.3, 0.9));
    let first = segmenter.push(frag("two", 2.0, 0.3, 0.9));
    assert_eq!(
        first,
        Some(Utterance {
            text: "one".to_string()
        })
    );
    let second = segmenter.push(frag("three", 4.0, 0.3, 0.9));
    assert_eq!(
        second,
        Some(Utterance {
            text: "two".to_string()
        })
    );
}

#[test]
fn test_reset_starts_fresh_buffer() {
    let mut segmenter = UtteranceSegmenter::new();
    segmenter.push(frag("select", 0.0, 0.4, 0.9));
    segmenter.push(frag("car", 0.5, 0.4, 0.9));
    segmenter.reset();
    assert_eq!(segmenter.buffered(), 0);

    // Fragments from a new subscription restart their own timeline; the old
    // ones must not leak into the next sentence.
    segmenter.push(frag("go", 0.0, 0.3, 0.9));
    let utterance = segmenter.push(frag("back", 2.0, 0.3, 0.9));
    assert_eq!(
        utterance,
        Some(Utterance {
            text: "go".to_string()
        })
    );
}

#[test]
fn test_custom_threshold() {
    let mut segmenter = UtteranceSegmenter::with_config(SegmenterConfig {
        pause_threshold: 0.5,
    });
    segmenter.push(frag("select", 0.0, 0.4, 0.9));
    let utterance = segmenter.push(frag("car", 1.0, 0.4, 0.9));
    assert_eq!(
        utterance,
        Some(Utterance {
            text: "select".to_string()
        })
    );
}
