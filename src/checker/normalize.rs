//! Best-effort rewriting of LaTeX-like answers into algebra input syntax.
//!
//! This is heuristic text rewriting, not a LaTeX parser. It never fails:
//! malformed input produces some string, and whether that string parses is
//! the caller's concern. Normalizing an already normalized string returns it
//! unchanged.

use std::sync::LazyLock;

use regex::Regex;

use super::expr::Func;

/// Maximum recursion depth when rewriting nested command arguments.
const MAX_REWRITE_DEPTH: usize = 32;

static RE_SPACING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\\(?:[,;:! ]|q?quad\b)").ok());

static RE_DELIMITER_SIZING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\\(?:left|right|big|Big|bigl|bigr|Bigl|Bigr)\b\.?").ok());

static RE_TIMES: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\\(?:cdot|times|ast)\b").ok());

static RE_DIV: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\\div\b").ok());

/// Commands whose braced argument is kept and the wrapper dropped.
const WRAPPER_COMMANDS: &[&str] = &[
    "mathrm",
    "text",
    "textrm",
    "operatorname",
    "mathbf",
    "mathit",
    "mathsf",
    "displaystyle",
];

/// Function commands mapped to bare function names.
const FUNCTION_COMMANDS: &[&str] = &[
    "sin", "cos", "tan", "cot", "sec", "csc", "arcsin", "arccos", "arctan", "sinh", "cosh",
    "tanh", "exp", "ln", "log",
];

/// Greek letter commands and the identifier each one becomes.
const GREEK_LETTERS: &[(&str, &str)] = &[
    ("alpha", "alpha"),
    ("beta", "beta"),
    ("gamma", "gamma"),
    ("delta", "delta"),
    ("epsilon", "epsilon"),
    ("varepsilon", "epsilon"),
    ("zeta", "zeta"),
    ("eta", "eta"),
    ("theta", "theta"),
    ("vartheta", "theta"),
    ("iota", "iota"),
    ("kappa", "kappa"),
    ("lambda", "lambda"),
    ("mu", "mu"),
    ("nu", "nu"),
    ("xi", "xi"),
    ("pi", "pi"),
    ("rho", "rho"),
    ("sigma", "sigma"),
    ("tau", "tau"),
    ("upsilon", "upsilon"),
    ("phi", "phi"),
    ("varphi", "phi"),
    ("chi", "chi"),
    ("psi", "psi"),
    ("omega", "omega"),
    ("Gamma", "Gamma"),
    ("Delta", "Delta"),
    ("Theta", "Theta"),
    ("Lambda", "Lambda"),
    ("Xi", "Xi"),
    ("Pi", "Pi"),
    ("Sigma", "Sigma"),
    ("Phi", "Phi"),
    ("Psi", "Psi"),
    ("Omega", "Omega"),
];

fn replace_all(re: &LazyLock<Option<Regex>>, input: &str, replacement: &str) -> String {
    match re.as_ref() {
        Some(re) => re.replace_all(input, replacement).into_owned(),
        None => input.to_string(),
    }
}

/// Normalize a LaTeX-like expression into algebra input syntax.
///
/// - `\frac{a}{b}` becomes `((a)/(b))`
/// - `\sqrt{x}` becomes `sqrt(x)` and `\sqrt[n]{x}` becomes `((x)**(1/(n)))`
/// - `^` becomes `**`
/// - `\mathrm{}`, `\text{}` and similar wrappers are dropped
/// - Greek letters and function commands lose their backslash
/// - explicit `*` is inserted for implicit multiplication
/// - braces become parentheses and whitespace is removed
pub fn normalize(input: &str) -> String {
    let mut s: String = input
        .chars()
        .filter(|c| *c != '$')
        .map(|c| match c {
            '×' | '·' | '⋅' => '*',
            '÷' => '/',
            '−' | '–' => '-',
            other => other,
        })
        .collect();
    s = s.replace('²', "^2").replace('³', "^3").replace('π', "pi");

    s = replace_all(&RE_SPACING, &s, " ");
    s = replace_all(&RE_DELIMITER_SIZING, &s, "");
    s = replace_all(&RE_TIMES, &s, "*");
    s = replace_all(&RE_DIV, &s, "/");

    s = rewrite_commands(&s, 0);

    let s: String = s
        .replace('^', "**")
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            other => other,
        })
        .collect();

    insert_multiplication(&s)
}

// =============================================================================
// Command rewriting
// =============================================================================

/// Read one command argument starting at `i`.
///
/// An argument is a braced group, a single command, or a single character.
/// Returns the argument text and the index just past it.
fn read_arg(chars: &[char], mut i: usize) -> (String, usize) {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= chars.len() {
        return (String::new(), i);
    }
    match chars[i] {
        '{' => read_group(chars, i, '{', '}'),
        '\\' => {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_alphabetic() {
                j += 1;
            }
            let j = j.max(i + 1).min(chars.len());
            (chars[i..j].iter().collect(), j)
        }
        c => (c.to_string(), i + 1),
    }
}

/// Read a delimited group whose opening delimiter is at `i`.
///
/// An unterminated group swallows the rest of the input.
fn read_group(chars: &[char], i: usize, open: char, close: char) -> (String, usize) {
    let mut depth = 0usize;
    for (j, &c) in chars.iter().enumerate().skip(i) {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return (chars[i + 1..j].iter().collect(), j + 1);
            }
        }
    }
    (chars[(i + 1).min(chars.len())..].iter().collect(), chars.len())
}

fn next_non_space(chars: &[char], mut i: usize) -> Option<(usize, char)> {
    while i < chars.len() {
        if !chars[i].is_whitespace() {
            return Some((i, chars[i]));
        }
        i += 1;
    }
    None
}

/// Rewrite backslash commands, recursing into their arguments.
fn rewrite_commands(input: &str, depth: usize) -> String {
    if depth > MAX_REWRITE_DEPTH {
        return input.replace('\\', "");
    }

    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Subscripts keep their content without braces: x_{12} -> x_12
        if c == '_' && chars.get(i + 1) == Some(&'{') {
            let (inner, next) = read_group(&chars, i + 1, '{', '}');
            out.push('_');
            out.push_str(&rewrite_commands(&inner, depth + 1));
            i = next;
            continue;
        }

        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i + 1;
        let mut end = start;
        while end < chars.len() && chars[end].is_ascii_alphabetic() {
            end += 1;
        }
        if end == start {
            // Escaped symbol such as \{ or a stray backslash.
            i += 1;
            continue;
        }
        let name: String = chars[start..end].iter().collect();
        i = end;

        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let (numerator, next) = read_arg(&chars, i);
                let (denominator, next) = read_arg(&chars, next);
                i = next;
                out.push_str(&format!(
                    "(({})/({}))",
                    rewrite_commands(&numerator, depth + 1),
                    rewrite_commands(&denominator, depth + 1)
                ));
            }
            "sqrt" => {
                let mut index = None;
                if let Some((pos, '[')) = next_non_space(&chars, i) {
                    let (inner, next) = read_group(&chars, pos, '[', ']');
                    index = Some(inner);
                    i = next;
                }
                let (radicand, next) = read_arg(&chars, i);
                i = next;
                let radicand = rewrite_commands(&radicand, depth + 1);
                match index {
                    Some(n) => out.push_str(&format!(
                        "(({})**(1/({})))",
                        radicand,
                        rewrite_commands(&n, depth + 1)
                    )),
                    None => out.push_str(&format!("sqrt({})", radicand)),
                }
            }
            wrapper if WRAPPER_COMMANDS.contains(&wrapper) => {
                if let Some((_, '{')) = next_non_space(&chars, i) {
                    let (inner, next) = read_arg(&chars, i);
                    i = next;
                    out.push_str(&rewrite_commands(&inner, depth + 1));
                }
            }
            func if FUNCTION_COMMANDS.contains(&func) => {
                out.push_str(func);
                // \sin x -> sin(x)
                if let Some((pos, next)) = next_non_space(&chars, i) {
                    if next.is_alphanumeric() {
                        let mut end = pos;
                        while end < chars.len() && chars[end].is_alphanumeric() {
                            end += 1;
                        }
                        let arg: String = chars[pos..end].iter().collect();
                        out.push_str(&format!("({})", arg));
                        i = end;
                    }
                }
            }
            other => {
                match GREEK_LETTERS.iter().find(|(command, _)| *command == other) {
                    Some((_, ident)) => {
                        out.push_str(ident);
                        // \pi r -> pi*r
                        if let Some((_, next)) = next_non_space(&chars, i) {
                            if next.is_alphanumeric() {
                                out.push('*');
                            }
                        }
                    }
                    None => out.push_str(other),
                }
            }
        }
    }

    out
}

// =============================================================================
// Implicit multiplication
// =============================================================================

/// Whether an exponent marker at `i` continues a number in scientific notation.
fn scientific_exponent_follows(chars: &[char], i: usize) -> bool {
    match chars.get(i + 1) {
        Some(c) if c.is_ascii_digit() => true,
        Some('+') | Some('-') => chars.get(i + 2).is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Insert `*` between adjacent operands.
///
/// Handles number-letter (`2x`), letter-number (`x2`), `)(`, `2(`, `)x` and
/// `x(` where `x` is not a known function name.
fn insert_multiplication(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);
    let mut ident = String::new();
    let mut in_number = false;
    let mut prev: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_number && (c == 'e' || c == 'E') && scientific_exponent_follows(&chars, i) {
            // Exponent marker, optional sign and digits stay one number.
            out.push(c);
            i += 1;
            if chars[i] == '+' || chars[i] == '-' {
                out.push(chars[i]);
                i += 1;
            }
            while i < chars.len() && chars[i].is_ascii_digit() {
                out.push(chars[i]);
                i += 1;
            }
            prev = Some(chars[i - 1]);
            continue;
        }

        let is_letter = c.is_alphabetic();
        if let Some(p) = prev {
            let p_is_letter = p.is_alphabetic();
            let p_ends_number = p.is_ascii_digit() || (p == '.' && in_number);
            let needs_star = (p_ends_number && is_letter)
                || (p_is_letter && c.is_ascii_digit())
                || (p == ')' && (c == '(' || c.is_alphanumeric()))
                || (p_ends_number && c == '(')
                || (p_is_letter && c == '(' && Func::from_name(&ident).is_none());
            if needs_star {
                out.push('*');
                ident.clear();
                in_number = false;
            }
        }

        if is_letter || c == '_' {
            ident.push(c);
            in_number = false;
        } else if c.is_ascii_digit() || c == '.' {
            if ident.is_empty() {
                in_number = true;
            } else {
                ident.push(c);
            }
        } else {
            ident.clear();
            in_number = false;
        }

        out.push(c);
        prev = Some(c);
        i += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        assert_eq!(normalize(r"\frac{1}{2}"), "((1)/(2))");
        assert_eq!(normalize(r"\dfrac{a+b}{c}"), "((a+b)/(c))");
        assert_eq!(normalize(r"\frac12"), "((1)/(2))");
    }

    #[test]
    fn test_nested_fraction() {
        assert_eq!(
            normalize(r"\frac{\frac{1}{x}}{2}"),
            "((((1)/(x)))/(2))"
        );
        assert_eq!(normalize(r"\frac{\sqrt{x}}{2}"), "((sqrt(x))/(2))");
    }

    #[test]
    fn test_square_root() {
        assert_eq!(normalize(r"\sqrt{x}"), "sqrt(x)");
        assert_eq!(normalize(r"\sqrt[3]{x}"), "((x)**(1/(3)))");
        assert_eq!(normalize(r"2\sqrt{2}"), "2*sqrt(2)");
    }

    #[test]
    fn test_powers() {
        assert_eq!(normalize("x^{2}"), "x**(2)");
        assert_eq!(normalize("x^2"), "x**2");
        assert_eq!(normalize("e^{-x}"), "e**(-x)");
        assert_eq!(normalize("x²"), "x**2");
    }

    #[test]
    fn test_wrappers_stripped() {
        assert_eq!(normalize(r"3\mathrm{m}"), "3*m");
        assert_eq!(normalize(r"\text{x}+1"), "x+1");
        assert_eq!(normalize(r"\operatorname{sin}(x)"), "sin(x)");
    }

    #[test]
    fn test_greek_letters() {
        assert_eq!(normalize(r"\alpha + \beta"), "alpha+beta");
        assert_eq!(normalize(r"\pi r^2"), "pi*r**2");
        assert_eq!(normalize(r"2\pi"), "2*pi");
        assert_eq!(normalize(r"\varphi"), "phi");
    }

    #[test]
    fn test_function_commands() {
        assert_eq!(normalize(r"\sin x"), "sin(x)");
        assert_eq!(normalize(r"\cos(2x)"), "cos(2*x)");
        assert_eq!(normalize(r"\ln{x}"), "ln(x)");
        assert_eq!(normalize(r"\sin 2x"), "sin(2*x)");
    }

    #[test]
    fn test_operators() {
        assert_eq!(normalize(r"2 \cdot 3"), "2*3");
        assert_eq!(normalize(r"a \times b"), "a*b");
        assert_eq!(normalize(r"a \div b"), "a/b");
        assert_eq!(normalize("6 ÷ 2 × 3"), "6/2*3");
        assert_eq!(normalize(r"\left( x \right)"), "(x)");
    }

    #[test]
    fn test_implicit_multiplication() {
        assert_eq!(normalize("2x"), "2*x");
        assert_eq!(normalize("x2"), "x*2");
        assert_eq!(normalize("(x+1)(x-1)"), "(x+1)*(x-1)");
        assert_eq!(normalize("2(x+1)"), "2*(x+1)");
        assert_eq!(normalize("(x+1)y"), "(x+1)*y");
        assert_eq!(normalize("x(x+1)"), "x*(x+1)");
        assert_eq!(normalize("sin(x)"), "sin(x)");
        assert_eq!(normalize("3xy"), "3*xy");
    }

    #[test]
    fn test_scientific_notation_preserved() {
        assert_eq!(normalize("1e-6"), "1e-6");
        assert_eq!(normalize("2.5E3x"), "2.5E3*x");
        assert_eq!(normalize("2e"), "2*e");
        assert_eq!(normalize("3.e2x"), "3.e2*x");
        assert_eq!(normalize("4e+10y"), "4e+10*y");
    }

    #[test]
    fn test_subscripts() {
        assert_eq!(normalize("x_{1} + x_{2}"), "x_1+x_2");
    }

    #[test]
    fn test_braces_and_whitespace() {
        assert_eq!(normalize("{a + b} * c"), "(a+b)*c");
        assert_eq!(normalize("  x  +  1  "), "x+1");
        assert_eq!(normalize("$x+1$"), "x+1");
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        for input in [
            r"\frac{1}{",
            r"\frac",
            r"\sqrt[3",
            r"\",
            r"{{{",
            r"}}}",
            r"x^",
            r"\sqrt[]{}",
            r"_{",
            "",
        ] {
            let _ = normalize(input);
        }
        assert_eq!(normalize(r"\frac{1}{"), "((1)/())");
    }

    #[test]
    fn test_idempotent_examples() {
        for input in [
            r"\frac{x^2-1}{x+1}",
            r"2\pi r",
            r"\sqrt[3]{x^{2}}",
            "3x(x+1)(x-2)",
            "1e-6x",
            "3.e2x",
            r"\sin 2x + \cos^2 x",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {}", input);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_latexish() -> impl Strategy<Value = String> {
            let token = prop_oneof![
                Just(r"\frac{".to_string()),
                Just(r"\sqrt".to_string()),
                Just(r"\pi ".to_string()),
                Just(r"\sin ".to_string()),
                Just(r"\cdot".to_string()),
                Just(r"\left(".to_string()),
                Just(r"\right)".to_string()),
                Just("}{".to_string()),
                Just("^{".to_string()),
                Just("_{".to_string()),
                "[a-z0-9+*/().^{} -]{1,4}",
                "[0-9]{1,2}[.]?[eE][+-]?[0-9]{0,2}[a-z]?",
            ];
            prop::collection::vec(token, 0..10).prop_map(|parts| parts.concat())
        }

        proptest! {
            // Property: normalizing twice equals normalizing once
            #[test]
            fn prop_normalize_idempotent(input in arb_latexish()) {
                let once = normalize(&input);
                prop_assert_eq!(normalize(&once), once);
            }

            // Property: output never contains characters that are always rewritten
            #[test]
            fn prop_output_has_no_latex_residue(input in arb_latexish()) {
                let out = normalize(&input);
                prop_assert!(!out.contains('\\'));
                prop_assert!(!out.contains('{'), "output contains '{{'");
                prop_assert!(!out.contains('}'), "output contains '}}'");
                prop_assert!(!out.contains('^'));
                prop_assert!(!out.chars().any(char::is_whitespace));
            }
        }
    }
}
