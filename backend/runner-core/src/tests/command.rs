// Unit tests for magic-line tokenizing and positional parsing

use crate::command::{CellMagic, parse_line, parse_tokens, tokenize};
use crate::error::command::CommandError;
use crate::options::{DimensionInput, RunOptions};

// ============================================
// tokenize()
// ============================================

/// **VALUE**: Verifies quoted JSON survives tokenizing as a single word.
///
/// **WHY THIS MATTERS**: `py_conf` and `js_src` are JSON literals with spaces and
/// double quotes. Users wrap them in single quotes exactly like in a shell.
///
/// **BUG THIS CATCHES**: Would catch a tokenizer that splits inside quotes or keeps
/// the quote characters in the word.
#[test]
fn given_single_quoted_json_when_tokenize_then_keeps_one_literal_word() {
    // GIVEN: A line with a quoted JSON object
    let line = r#"640 480 black py '{"packages": ["numpy"]}'"#;

    // WHEN: Tokenizing
    let words = tokenize(line).expect("line should tokenize");

    // THEN: The JSON is one word without the quotes
    assert_eq!(
        words,
        vec!["640", "480", "black", "py", r#"{"packages": ["numpy"]}"#]
    );
}

/// **VALUE**: Verifies double quotes honour `\"` and backslashes escape outside quotes.
///
/// **BUG THIS CATCHES**: Would catch escape handling that drops or duplicates characters.
#[test]
fn given_escapes_when_tokenize_then_unescapes_like_a_shell() {
    // GIVEN: Escaped quote inside double quotes and an escaped space outside
    let line = r#""say \"hi\"" light\ blue"#;

    // WHEN: Tokenizing
    let words = tokenize(line).expect("line should tokenize");

    // THEN: Both words are unescaped
    assert_eq!(words, vec![r#"say "hi""#, "light blue"]);
}

/// **VALUE**: Verifies adjacent quoted and bare segments join into one word.
#[test]
fn given_adjacent_segments_when_tokenize_then_joins_them() {
    let words = tokenize("a'b c'd \"\"").expect("line should tokenize");

    assert_eq!(words, vec!["ab cd", ""]);
}

/// **VALUE**: Verifies an empty or blank line gives no words.
///
/// **BUG THIS CATCHES**: Would catch a tokenizer that emits an empty word for
/// trailing whitespace, which would then overwrite `width` with garbage.
#[test]
fn given_blank_line_when_tokenize_then_returns_no_words() {
    assert!(tokenize("").expect("empty line").is_empty());
    assert!(tokenize("   \t ").expect("blank line").is_empty());
}

/// **VALUE**: Verifies an unterminated quote is an error naming the quote char.
///
/// **WHY THIS MATTERS**: Silently accepting the rest of the line as one word would
/// hand half a JSON literal to the renderer and produce a confusing error there.
#[test]
fn given_unterminated_quote_when_tokenize_then_returns_unterminated_quote_error() {
    // GIVEN: A line missing its closing single quote
    let line = "500 500 white py '{";

    // WHEN: Tokenizing
    let result = tokenize(line);

    // THEN: UnterminatedQuote with the opening quote
    match result {
        Err(CommandError::UnterminatedQuote { quote, line: text, .. }) => {
            assert_eq!(quote, '\'');
            assert_eq!(text, line);
        }
        other => panic!("Expected UnterminatedQuote, got {other:?}"),
    }
}

// ============================================
// parse_line() / parse_tokens()
// ============================================

/// **VALUE**: Verifies positional tokens land in the right fields.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one in the positional table that
/// shifts every later argument into the wrong field.
#[test]
fn given_all_nine_tokens_when_parse_line_then_fills_every_positional_field() {
    // GIVEN: A full magic line
    let line = r#"300 200 black PY '{"a": 1}' '{"packages": []}' '["x.js"]' 2024.9.1 width=500"#;

    // WHEN: Parsing
    let layer = parse_line(line).expect("line should parse");

    // THEN: Each field holds its token
    assert_eq!(layer.width, Some(DimensionInput::from("300")));
    assert_eq!(layer.height, Some(DimensionInput::from("200")));
    assert_eq!(layer.background.as_deref(), Some("black"));
    assert_eq!(layer.py_type.as_deref(), Some("PY"));
    assert_eq!(layer.py_val.as_deref(), Some(r#"{"a": 1}"#));
    assert_eq!(layer.py_conf.as_deref(), Some(r#"{"packages": []}"#));
    assert_eq!(layer.js_src.as_deref(), Some(r#"["x.js"]"#));
    assert_eq!(layer.py_ver.as_deref(), Some("2024.9.1"));
    assert_eq!(layer.viewport.as_deref(), Some("width=500"));
}

/// **VALUE**: Verifies `{}` and `[]` placeholders mean "unset", not "empty JSON".
///
/// **WHY THIS MATTERS**: Users must be able to skip py_val/py_conf/js_src to reach
/// `py_ver` and `viewport` positionally.
#[test]
fn given_sentinel_tokens_when_parse_line_then_leaves_fields_unset() {
    // GIVEN: Placeholders for the JSON fields
    let line = "500 500 white mpy {} {} [] none";

    // WHEN: Parsing
    let layer = parse_line(line).expect("line should parse");

    // THEN: The JSON fields stay unset, later fields are still read
    assert_eq!(layer.py_val, None);
    assert_eq!(layer.py_conf, None);
    assert_eq!(layer.js_src, None);
    assert_eq!(layer.py_ver.as_deref(), Some("none"));
}

/// **VALUE**: Verifies more than nine tokens is rejected.
#[test]
fn given_ten_tokens_when_parse_tokens_then_returns_too_many_arguments() {
    let tokens = (0..10).map(|i| i.to_string()).collect();

    match parse_tokens(tokens) {
        Err(CommandError::TooManyArguments { max, actual, .. }) => {
            assert_eq!(max, 9);
            assert_eq!(actual, 10);
        }
        other => panic!("Expected TooManyArguments, got {other:?}"),
    }
}

/// **VALUE**: Verifies a non-numeric width falls back to 500 once resolved.
///
/// **BUG THIS CATCHES**: Would catch a parse failure being propagated as an error
/// instead of the documented fallback.
#[test]
fn given_non_numeric_width_when_resolved_then_falls_back_to_default() {
    // GIVEN: A width that is not a number
    let layer = parse_line("wide 320").expect("line should parse");

    // WHEN: Applying it on top of the defaults
    let options = RunOptions::default().overlay(layer);

    // THEN: Width falls back, height is taken
    assert_eq!(options.width, 500);
    assert_eq!(options.height, 320);
}

// ============================================
// CellMagic
// ============================================

/// **VALUE**: Verifies the two magics differ only in `htmlmode` and both carry the cell.
#[test]
fn given_cell_body_when_invoke_magics_then_sets_script_and_mode() {
    // GIVEN: A cell body
    let cell = "print('hello')";

    // WHEN: Invoking both magics with an empty line
    let run = CellMagic::RunPys.invoke("", cell).expect("runpys");
    let gen_layer = CellMagic::GenPys.invoke("", cell).expect("genpys");

    // THEN: Script set on both, htmlmode differs
    assert_eq!(run.py_script.as_deref(), Some(cell));
    assert_eq!(run.htmlmode, Some(false));
    assert_eq!(gen_layer.py_script.as_deref(), Some(cell));
    assert_eq!(gen_layer.htmlmode, Some(true));
    assert_eq!(CellMagic::RunPys.name(), "runpys");
    assert_eq!(CellMagic::GenPys.name(), "genpys");
}
