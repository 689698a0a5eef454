//! Coercion tests for parameters extracted from real code lines.

use printhost_commands::{Code, split_codes};

fn single(input: &str) -> Code {
    let mut codes: Vec<Code> = split_codes(input).collect::<Result<_, _>>().unwrap();
    assert_eq!(codes.len(), 1, "expected one code from {input:?}");
    codes.pop().unwrap()
}

#[test]
fn numeric_widening_and_narrowing() {
    let code = single("M203 X6000 Y6000.5");
    assert_eq!(code.parameter('X').unwrap().as_float().unwrap(), 6000.0);
    assert_eq!(code.parameter('Y').unwrap().as_integer().unwrap(), 6001);
    assert_eq!(code.parameter('X').unwrap().as_unsigned().unwrap(), 6000);
}

#[test]
fn negative_to_unsigned_fails() {
    let code = single("M106 H-1");
    let err = code.parameter('H').unwrap().as_unsigned().unwrap_err();
    assert_eq!(err.letter, 'H');
}

#[test]
fn scalar_to_array_is_a_singleton() {
    let code = single("M584 E3");
    assert_eq!(
        code.parameter('E').unwrap().as_integer_array().unwrap(),
        vec![3]
    );
}

#[test]
fn colon_separated_float_array() {
    let code = single("M92 E420:430.5");
    let factors = code.parameter('E').unwrap().as_float_array().unwrap();
    assert_eq!(factors.len(), 2);
    assert!((factors[0] - 420.0).abs() < 1e-6);
    assert!((factors[1] - 430.5).abs() < 1e-6);
}

#[test]
fn trailing_colon_is_rejected() {
    let code = single("M92 E420:");
    assert!(code.parameter('E').unwrap().as_float_array().is_err());
}

#[test]
fn string_from_number_is_canonical() {
    let code = single("M550 P123");
    assert_eq!(code.parameter('P').unwrap().as_string(), "123");
}

#[test]
fn quoted_string_keeps_interior_spaces() {
    let code = single("M550 P\"My  Printer\"");
    let p = code.parameter('P').unwrap();
    assert!(p.is_quoted());
    assert_eq!(p.as_string(), "My  Printer");
}

#[test]
fn driver_ids_from_strings_and_integers() {
    let code = single("M569 P0.4 R3");
    assert_eq!(code.parameter('P').unwrap().as_driver_id().unwrap().value(), 4);
    assert_eq!(code.parameter('R').unwrap().as_driver_id().unwrap().value(), 3);
}

#[test]
fn expression_rejects_every_numeric_coercion() {
    let code = single("M563 P{state.currentTool + 1}");
    let p = code.parameter('P').unwrap();
    assert!(p.is_expression());
    assert!(p.as_integer().is_err());
    assert!(p.as_unsigned().is_err());
    assert!(p.as_float().is_err());
    assert!(p.as_bool().is_err());
    assert!(p.as_driver_id().is_err());
    assert!(p.as_float_array().is_err());
}

#[test]
fn parameters_keep_source_order_and_duplicates() {
    let code = single("M574 X1 S1 X2");
    let letters: Vec<char> = code.parameters.iter().map(|p| p.letter()).collect();
    assert_eq!(letters, vec!['X', 'S', 'X']);
    // parameter() returns the first occurrence.
    assert_eq!(code.parameter('X').unwrap().as_integer().unwrap(), 1);
}
