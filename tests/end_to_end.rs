//! End-to-end scenarios over the bundled resource modes.

use tengscribe::prelude::*;

fn load(name: &str) -> Mode {
    let library = ModeLibrary::scan("resources").expect("resource directory");
    let mut mode = library.load(name).expect("mode parses");
    mode.finalize(&OptionMap::new()).expect("mode finalizes");
    mode
}

fn quenya() -> Mode {
    load("quenya-classical")
}

fn sindarin() -> Mode {
    load("sindarin-general")
}

#[test]
fn empty_input_is_ok_and_empty() {
    let result = quenya().transcribe("");
    assert!(result.ok);
    assert_eq!(result.output, "");
    assert!(result.debug.warnings.is_empty());
}

#[test]
fn lone_short_vowel_is_a_single_tehta() {
    let result = quenya().transcribe("a");
    assert!(result.ok);
    assert_eq!(result.output, "\u{E0A0}");
}

#[test]
fn namarie_line_transcribes_exactly() {
    let result = quenya().transcribe("Ai ! lauri\u{EB} lantar lassi s\u{FA}rinen ,");
    assert!(result.ok);
    let expected = concat!(
        "\u{E058}\u{E0A8}",                                         // ai
        " \u{E0C4} ",                                               // !
        "\u{E068}\u{E0A0}\u{E0B0}\u{E060}\u{E0A8}\u{E0A4}",         // laurië
        " ",
        "\u{E068}\u{E0A0}\u{E040}\u{E000}\u{E0A0}\u{E060}",         // lantar
        " ",
        "\u{E068}\u{E0A0}\u{E078}\u{E0A8}",                         // lassi
        " ",
        "\u{E070}\u{E094}\u{E0B0}\u{E060}\u{E0A8}\u{E040}\u{E0A4}\u{E040}", // súrinen
        " \u{E0C0}",                                                // ,
    );
    assert_eq!(result.output, expected);
    assert!(result.debug.warnings.is_empty());
}

#[test]
fn mellon_applies_the_doubled_l_ligature() {
    let result = sindarin().transcribe("mellon");
    assert!(result.ok);
    assert_eq!(
        result.output,
        "\u{E044}\u{E0A4}\u{E0B4}\u{E0AC}\u{E040}"
    );
    // The ligature came from virtual resolution, not a direct rule.
    assert!(result
        .debug
        .processor_output
        .iter()
        .any(|t| t.as_symbol() == Some("LIGA_LL")));
    assert!(result.debug.warnings.is_empty());
}

#[test]
fn cross_rule_reorders_digit_triples() {
    let result = quenya().transcribe("123");
    assert!(result.ok);
    assert_eq!(result.output, "312");
}

#[test]
fn cross_rule_deployment_respects_options() {
    let library = ModeLibrary::scan("resources").unwrap();
    let mut mode = library.load("quenya-classical").unwrap();
    let mut options = OptionMap::new();
    options.insert("reverse_numbers".to_string(), OptionValue::Bool(false));
    mode.finalize(&options).unwrap();
    assert_eq!(mode.transcribe("123").output, "123");
}

#[test]
fn diaeresis_normalizes_before_matching() {
    let mode = quenya();
    let with = mode.transcribe("lauri\u{EB}");
    let without = mode.transcribe("laurie");
    assert_eq!(with.output, without.output);
    // Decomposed input normalizes identically too.
    let decomposed = mode.transcribe("laurie\u{308}");
    assert_eq!(decomposed.output, without.output);
}

#[test]
fn long_vowels_take_the_long_carrier() {
    let result = quenya().transcribe("s\u{FA}rinen");
    assert!(result.output.starts_with("\u{E070}\u{E094}\u{E0B0}"));
}

#[test]
fn initial_h_differs_from_medial_h() {
    let mode = quenya();
    assert_eq!(mode.transcribe("ha").output, "\u{E080}\u{E0A0}");
    assert_eq!(
        mode.transcribe("aha").output,
        "\u{E0A0}\u{E028}\u{E0A0}"
    );
}

#[test]
fn sequence_virtual_expands() {
    let result = quenya().transcribe("x");
    assert_eq!(result.output, "\u{E00C}\u{E074}");
}

#[test]
fn unmapped_scalars_pass_through() {
    let result = quenya().transcribe("#");
    assert!(result.ok);
    assert_eq!(result.output, "#");
}

#[test]
fn mixed_whitespace_runs_collapse() {
    let result = quenya().transcribe("a  \t a");
    assert_eq!(result.output, "\u{E0A0} \u{E0A0}");
}

#[test]
fn multiline_input_keeps_line_breaks() {
    let result = quenya().transcribe("a\na");
    assert_eq!(result.output, "\u{E0A0}\n\u{E0A0}");
}

#[test]
fn transcription_is_deterministic() {
    let mode = quenya();
    let first = mode.transcribe("lantar lassi");
    let second = mode.transcribe("lantar lassi");
    assert_eq!(first.output, second.output);
    assert_eq!(first.debug, second.debug);
}

#[test]
fn refinalizing_with_same_options_transcribes_identically() {
    let library = ModeLibrary::scan("resources").unwrap();
    let mut mode = library.load("quenya-classical").unwrap();
    mode.finalize(&OptionMap::new()).unwrap();
    let before = mode.transcribe("lantar").output;
    mode.finalize(&OptionMap::new()).unwrap();
    assert_eq!(mode.transcribe("lantar").output, before);
}

#[test]
fn output_stays_in_declared_scalar_ranges() {
    let mode = quenya();
    for input in ["Ai ! lauri\u{EB} lantar lassi s\u{FA}rinen ,", "123", "x", "#"] {
        for c in mode.transcribe(input).output.chars() {
            let u = c as u32;
            let allowed = (0x20..=0x7E).contains(&u)
                || u == 0x0A
                || (0xE000..=0xF8FF).contains(&u)
                || (0xE0000..=0xEFFFF).contains(&u);
            assert!(allowed, "scalar U+{u:04X} outside declared ranges");
        }
    }
}

#[test]
fn debug_record_captures_every_stage() {
    let result = quenya().transcribe("ai");
    assert!(!result.debug.preprocessor_output.is_empty());
    assert!(!result.debug.processor_output.is_empty());
    assert!(!result.debug.postprocessor_output.is_empty());
    assert_eq!(result.debug.spans.len(), 1);
    assert_eq!(result.debug.spans[0].consumed, "ai");
}

#[test]
fn library_lists_bundled_modes() {
    let library = ModeLibrary::scan("resources").unwrap();
    assert_eq!(
        library.mode_names(),
        ["quenya-classical", "sindarin-general"]
    );
}
