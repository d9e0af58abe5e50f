//! Symbolic equivalence of parsed expressions.
//!
//! Three tools, from cheapest to most permissive:
//!
//! - [`canonical`] rewrites an expression into a sorted, constant-folded
//!   form in which sums and products are flattened and like terms and like
//!   factors are combined. Two expressions that differ only by operand
//!   order, grouping or trivially foldable constants share a canonical form.
//! - [`expand`] turns a canonical form into a sparse Laurent polynomial over
//!   atoms. Plain symbols are atoms; everything the polynomial ring cannot
//!   express (function calls, fractional powers, powers of sums with
//!   negative exponents) becomes an opaque atom keyed by its canonical text.
//! - numeric probing evaluates both sides at fixed pseudo-random points.
//!
//! [`symbolically_equal`] uses only the canonical form. [`difference_is_zero`]
//! expands the difference and falls back to probing when opaque atoms are
//! involved or expansion exceeds its limits.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::expr::{Constant, Expr, Func};

// =============================================================================
// Constants
// =============================================================================

/// Relative tolerance used when comparing floating point values.
pub const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Largest integer exponent that is expanded by repeated multiplication.
pub const MAX_EXPAND_EXPONENT: i64 = 64;

/// Largest number of terms an expanded polynomial may hold.
pub const MAX_POLY_TERMS: usize = 4096;

/// Number of sample points used for numeric probing.
pub const PROBE_POINTS: usize = 16;

/// Minimum number of points where both sides must be finite.
pub const MIN_FINITE_PROBES: usize = 3;

const PROBE_SEED: u64 = 0x5EED_CA5E;

/// Relative comparison. Non-finite values only equal themselves and zero
/// only equals zero.
fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

/// Whether a sum is cancellation noise relative to the magnitude of its
/// addends, e.g. `0.1 + 0.2 - 0.3`.
fn cancels(sum: f64, scale: f64) -> bool {
    sum == 0.0 || (sum.is_finite() && scale.is_finite() && sum.abs() <= RELATIVE_TOLERANCE * scale)
}

fn is_integer(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15
}

/// Format a number so that canonical keys are stable across rounding noise.
fn fmt_num(n: f64) -> String {
    if is_integer(n) {
        return format!("{}", n as i64);
    }
    let s = format!("{:.12}", n);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

// =============================================================================
// Canonical form
// =============================================================================

/// Canonical expression tree.
#[derive(Debug, Clone)]
pub enum Canon {
    Num(f64),
    Sym(String),
    Const(Constant),
    /// Sum; at most one numeric term, placed first.
    Add(Vec<Canon>),
    /// Product; at most one numeric coefficient, placed first.
    Mul(Vec<Canon>),
    Pow(Box<Canon>, Box<Canon>),
    Call(Func, Box<Canon>),
}

impl Canon {
    fn as_num(&self) -> Option<f64> {
        match self {
            Canon::Num(n) => Some(*n),
            _ => None,
        }
    }

    fn key(&self) -> String {
        self.to_string()
    }

    /// Whether the expression contains no free symbols.
    pub fn is_constant(&self) -> bool {
        match self {
            Canon::Num(_) | Canon::Const(_) => true,
            Canon::Sym(_) => false,
            Canon::Add(items) | Canon::Mul(items) => items.iter().all(Canon::is_constant),
            Canon::Pow(a, b) => a.is_constant() && b.is_constant(),
            Canon::Call(_, a) => a.is_constant(),
        }
    }

    /// Evaluate numerically. Unbound symbols evaluate to NaN.
    pub fn eval(&self, vars: &HashMap<String, f64>) -> f64 {
        match self {
            Canon::Num(n) => *n,
            Canon::Sym(name) => vars.get(name).copied().unwrap_or(f64::NAN),
            Canon::Const(c) => c.value(),
            Canon::Add(items) => items.iter().map(|t| t.eval(vars)).sum(),
            Canon::Mul(items) => items.iter().map(|t| t.eval(vars)).product(),
            Canon::Pow(a, b) => a.eval(vars).powf(b.eval(vars)),
            Canon::Call(f, a) => f.apply(a.eval(vars)),
        }
    }

    /// Structural equality with tolerant numeric leaves.
    pub fn same_as(&self, other: &Canon) -> bool {
        match (self, other) {
            (Canon::Num(a), Canon::Num(b)) => approx_eq(*a, *b),
            (Canon::Sym(a), Canon::Sym(b)) => a == b,
            (Canon::Const(a), Canon::Const(b)) => a == b,
            (Canon::Add(a), Canon::Add(b)) | (Canon::Mul(a), Canon::Mul(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Canon::Pow(a1, b1), Canon::Pow(a2, b2)) => a1.same_as(a2) && b1.same_as(b2),
            (Canon::Call(f1, a1), Canon::Call(f2, a2)) => f1 == f2 && a1.same_as(a2),
            _ => false,
        }
    }
}

impl fmt::Display for Canon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Canon::Num(n) => write!(f, "{}", fmt_num(*n)),
            Canon::Sym(name) => write!(f, "{}", name),
            Canon::Const(c) => write!(f, "{}", c.name()),
            Canon::Add(items) => {
                let parts: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", parts.join(" + "))
            }
            Canon::Mul(items) => {
                let parts: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", parts.join("*"))
            }
            Canon::Pow(a, b) => write!(f, "({})**({})", a, b),
            Canon::Call(func, a) => write!(f, "{}({})", func.name(), a),
        }
    }
}

/// Rewrite an expression into canonical form.
pub fn canonical(expr: &Expr) -> Canon {
    match expr {
        Expr::Num(n) => Canon::Num(*n),
        Expr::Sym(name) => Canon::Sym(name.clone()),
        Expr::Const(c) => Canon::Const(*c),
        Expr::Neg(a) => mul(vec![Canon::Num(-1.0), canonical(a)]),
        Expr::Add(a, b) => add(vec![canonical(a), canonical(b)]),
        Expr::Sub(a, b) => add(vec![
            canonical(a),
            mul(vec![Canon::Num(-1.0), canonical(b)]),
        ]),
        Expr::Mul(a, b) => mul(vec![canonical(a), canonical(b)]),
        Expr::Div(a, b) => mul(vec![canonical(a), pow(canonical(b), Canon::Num(-1.0))]),
        Expr::Pow(a, b) => pow(canonical(a), canonical(b)),
        Expr::Call(f, a) => call(*f, canonical(a)),
    }
}

fn sort_terms(items: &mut [Canon]) {
    items.sort_by_cached_key(Canon::key);
}

/// Build a canonical sum.
fn add(items: Vec<Canon>) -> Canon {
    let mut flat = Vec::new();
    for item in items {
        match item {
            Canon::Add(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    // Combine like terms: coefficient * rest, keyed by rest.
    let mut constant = Coeff::default();
    let mut groups: BTreeMap<String, (Coeff, Vec<Canon>)> = BTreeMap::new();
    for term in flat {
        if let Some(n) = term.as_num() {
            constant.accumulate(n);
            continue;
        }
        let (coeff, rest) = split_coefficient(term);
        let key = rest.iter().map(Canon::key).collect::<Vec<_>>().join("*");
        let entry = groups.entry(key).or_insert((Coeff::default(), rest));
        entry.0.accumulate(coeff);
    }

    let mut terms: Vec<Canon> = groups
        .into_values()
        .filter(|(coeff, _)| !coeff.vanishes())
        .map(|(coeff, mut rest)| {
            let coeff = coeff.value;
            if approx_eq(coeff, 1.0) {
                if rest.len() == 1 {
                    rest.remove(0)
                } else {
                    Canon::Mul(rest)
                }
            } else {
                let mut factors = vec![Canon::Num(coeff)];
                factors.extend(rest);
                Canon::Mul(factors)
            }
        })
        .collect();
    sort_terms(&mut terms);

    if !constant.vanishes() {
        terms.insert(0, Canon::Num(constant.value));
    }

    match terms.len() {
        0 => Canon::Num(0.0),
        1 => terms.remove(0),
        _ => Canon::Add(terms),
    }
}

/// Split a term into its numeric coefficient and sorted remaining factors.
fn split_coefficient(term: Canon) -> (f64, Vec<Canon>) {
    match term {
        Canon::Mul(mut factors) => match factors.first().and_then(Canon::as_num) {
            Some(n) => {
                factors.remove(0);
                (n, factors)
            }
            None => (1.0, factors),
        },
        other => (1.0, vec![other]),
    }
}

/// Build a canonical product.
fn mul(items: Vec<Canon>) -> Canon {
    let mut flat = Vec::new();
    for item in items {
        match item {
            Canon::Mul(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }

    let mut coeff = 1.0;
    // Group factors by base, collecting exponents.
    let mut groups: BTreeMap<String, (Canon, Vec<Canon>)> = BTreeMap::new();
    for factor in flat {
        if let Some(n) = factor.as_num() {
            coeff *= n;
            continue;
        }
        let (base, exponent) = match factor {
            Canon::Pow(b, e) => (*b, *e),
            other => (other, Canon::Num(1.0)),
        };
        let key = base.key();
        groups
            .entry(key)
            .or_insert_with(|| (base, Vec::new()))
            .1
            .push(exponent);
    }

    if coeff == 0.0 {
        return Canon::Num(0.0);
    }

    let mut factors = Vec::new();
    for (_, (base, exponents)) in groups {
        let exponent = if exponents.len() == 1 {
            exponents.into_iter().next().unwrap_or(Canon::Num(1.0))
        } else {
            add(exponents)
        };
        match pow(base, exponent) {
            Canon::Num(n) => coeff *= n,
            Canon::Mul(inner) => {
                for f in inner {
                    match f.as_num() {
                        Some(n) => coeff *= n,
                        None => factors.push(f),
                    }
                }
            }
            other => factors.push(other),
        }
    }
    sort_terms(&mut factors);

    if coeff == 0.0 {
        return Canon::Num(0.0);
    }
    if factors.is_empty() {
        return Canon::Num(coeff);
    }
    if !approx_eq(coeff, 1.0) {
        factors.insert(0, Canon::Num(coeff));
    }
    if factors.len() == 1 {
        factors.remove(0)
    } else {
        Canon::Mul(factors)
    }
}

/// Build a canonical power.
fn pow(base: Canon, exponent: Canon) -> Canon {
    if let Some(e) = exponent.as_num() {
        if e == 0.0 {
            return Canon::Num(1.0);
        }
        if approx_eq(e, 1.0) {
            return base;
        }
        if let Some(b) = base.as_num() {
            let value = b.powf(e);
            if value.is_finite() {
                return Canon::Num(value);
            }
        }
        if is_integer(e) {
            match base {
                // (a**b)**n == a**(b*n) for integer n
                Canon::Pow(inner_base, inner_exp) => {
                    return pow(*inner_base, mul(vec![*inner_exp, Canon::Num(e)]));
                }
                // (a*b)**n == a**n * b**n for integer n
                Canon::Mul(factors) => {
                    return mul(
                        factors
                            .into_iter()
                            .map(|f| pow(f, Canon::Num(e)))
                            .collect(),
                    );
                }
                other => return Canon::Pow(Box::new(other), Box::new(Canon::Num(e))),
            }
        }
    }
    if let Some(b) = base.as_num() {
        if approx_eq(b, 1.0) {
            return Canon::Num(1.0);
        }
    }
    if let Canon::Const(Constant::E) = base {
        return call(Func::Exp, exponent);
    }
    Canon::Pow(Box::new(base), Box::new(exponent))
}

/// Build a canonical function application.
fn call(func: Func, arg: Canon) -> Canon {
    match func {
        Func::Sqrt => return pow(arg, Canon::Num(0.5)),
        Func::Exp => {
            if let Canon::Call(Func::Log, inner) = arg {
                return *inner;
            }
        }
        Func::Log => {
            if let Canon::Const(Constant::E) = arg {
                return Canon::Num(1.0);
            }
            if let Canon::Call(Func::Exp, inner) = arg {
                return *inner;
            }
        }
        _ => {}
    }
    if let Some(x) = arg.as_num() {
        let value = func.apply(x);
        // Only fold when the result is exact enough to be a stable key.
        if value.is_finite() && is_integer(value) {
            return Canon::Num(value);
        }
    }
    Canon::Call(func, Box::new(arg))
}

/// Check whether two expressions have the same canonical form.
///
/// Constant expressions are also compared by value.
pub fn symbolically_equal(a: &Expr, b: &Expr) -> bool {
    let ca = canonical(a);
    let cb = canonical(b);
    if ca.same_as(&cb) {
        return true;
    }
    if ca.is_constant() && cb.is_constant() {
        let empty = HashMap::new();
        let (va, vb) = (ca.eval(&empty), cb.eval(&empty));
        return va.is_finite() && vb.is_finite() && approx_eq(va, vb);
    }
    false
}

// =============================================================================
// Polynomial expansion
// =============================================================================

/// Product of atoms raised to integer powers.
type Monomial = BTreeMap<String, i64>;

/// Running coefficient with the total magnitude of what was summed into it.
#[derive(Debug, Clone, Copy, Default)]
struct Coeff {
    value: f64,
    scale: f64,
}

impl Coeff {
    fn new(value: f64) -> Self {
        Self {
            value,
            scale: value.abs(),
        }
    }

    fn accumulate(&mut self, n: f64) {
        self.value += n;
        self.scale += n.abs();
    }

    fn vanishes(&self) -> bool {
        cancels(self.value, self.scale)
    }
}

/// Sparse Laurent polynomial over atoms.
#[derive(Debug, Clone, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, Coeff>,
    /// Whether any atom is an opaque subterm rather than a plain symbol.
    opaque: bool,
}

impl Poly {
    fn constant(c: f64) -> Self {
        let mut terms = BTreeMap::new();
        if c != 0.0 {
            terms.insert(Monomial::new(), Coeff::new(c));
        }
        Self {
            terms,
            opaque: false,
        }
    }

    fn atom(key: String, opaque: bool) -> Self {
        let mut mono = Monomial::new();
        mono.insert(key, 1);
        let mut terms = BTreeMap::new();
        terms.insert(mono, Coeff::new(1.0));
        Self { terms, opaque }
    }

    /// Whether every coefficient cancelled out.
    pub fn is_zero(&self) -> bool {
        self.terms.values().all(Coeff::vanishes)
    }

    /// Whether the polynomial mentions opaque atoms.
    pub fn has_opaque_atoms(&self) -> bool {
        self.opaque
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn prune(&mut self) {
        self.terms.retain(|_, c| !c.vanishes());
    }

    fn plus(mut self, other: Poly) -> Poly {
        for (mono, c) in other.terms {
            self.terms.entry(mono).or_default().accumulate(c.value);
        }
        self.opaque |= other.opaque;
        self.prune();
        self
    }

    fn times(&self, other: &Poly) -> Option<Poly> {
        let mut out = Poly {
            terms: BTreeMap::new(),
            opaque: self.opaque || other.opaque,
        };
        for (m1, c1) in &self.terms {
            for (m2, c2) in &other.terms {
                let mut mono = m1.clone();
                for (atom, e) in m2 {
                    let entry = mono.entry(atom.clone()).or_insert(0);
                    *entry += e;
                    if *entry == 0 {
                        mono.remove(atom);
                    }
                }
                out.terms
                    .entry(mono)
                    .or_default()
                    .accumulate(c1.value * c2.value);
            }
            if out.terms.len() > MAX_POLY_TERMS {
                return None;
            }
        }
        out.prune();
        Some(out)
    }

    fn powi(&self, n: i64) -> Option<Poly> {
        if n == 0 {
            return Some(Poly::constant(1.0));
        }
        if n < 0 {
            // Only a single monomial has a polynomial inverse.
            if self.terms.len() != 1 {
                return None;
            }
            let (mono, c) = self.terms.iter().next()?;
            if c.value == 0.0 {
                return None;
            }
            let inverse: Monomial = mono.iter().map(|(k, e)| (k.clone(), -e)).collect();
            let mut terms = BTreeMap::new();
            terms.insert(inverse, Coeff::new(1.0 / c.value));
            return Poly {
                terms,
                opaque: self.opaque,
            }
            .powi(-n);
        }
        let mut result = Poly::constant(1.0);
        for _ in 0..n {
            result = result.times(self)?;
        }
        Some(result)
    }
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|(mono, c)| {
                let mut s = fmt_num(c.value);
                for (atom, e) in mono {
                    s.push_str(&format!("*{}^{}", atom, e));
                }
                s
            })
            .collect();
        write!(f, "{}", parts.join(" + "))
    }
}

/// Expand a canonical expression into a polynomial over atoms.
///
/// Powers whose expansion would exceed the size limits are kept as opaque
/// atoms. Returns `None` only when a sum or product itself is too large.
pub fn expand(canon: &Canon) -> Option<Poly> {
    match canon {
        Canon::Num(n) => Some(Poly::constant(*n)),
        Canon::Sym(name) => Some(Poly::atom(name.clone(), false)),
        Canon::Const(c) => Some(Poly::atom(c.name().to_string(), false)),
        Canon::Add(items) => {
            let mut acc = Poly::constant(0.0);
            for item in items {
                acc = acc.plus(expand(item)?);
                if acc.len() > MAX_POLY_TERMS {
                    return None;
                }
            }
            Some(acc)
        }
        Canon::Mul(items) => {
            let mut acc = Poly::constant(1.0);
            for item in items {
                acc = acc.times(&expand(item)?)?;
            }
            Some(acc)
        }
        Canon::Pow(base, exponent) => {
            if let Some(e) = exponent.as_num() {
                if is_integer(e) && (e as i64).abs() <= MAX_EXPAND_EXPONENT {
                    let base_poly = expand(base)?;
                    if let Some(p) = base_poly.powi(e as i64) {
                        return Some(p);
                    }
                }
            }
            Some(Poly::atom(opaque_key(canon), true))
        }
        Canon::Call(_, _) => Some(Poly::atom(opaque_key(canon), true)),
    }
}

/// Key for an opaque atom.
///
/// Function arguments are expanded first so that `sin((x+1)**2)` and
/// `sin(x**2 + 2*x + 1)` share an atom.
fn opaque_key(canon: &Canon) -> String {
    match canon {
        Canon::Call(func, arg) => match expand(arg) {
            Some(p) => format!("{}[{}]", func.name(), p),
            None => canon.key(),
        },
        Canon::Pow(base, exponent) => {
            let base_key = expand(base).map(|p| p.to_string()).unwrap_or(base.key());
            let exp_key = expand(exponent)
                .map(|p| p.to_string())
                .unwrap_or(exponent.key());
            format!("[{}]^[{}]", base_key, exp_key)
        }
        other => other.key(),
    }
}

// =============================================================================
// Numeric probing
// =============================================================================

/// Outcome of comparing two expressions at sample points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// Agreed at every point where either side was finite.
    Agree,
    /// Disagreed at some point.
    Disagree,
    /// Too few points where both sides were finite.
    Inconclusive,
}

/// Deterministic sample points for the given symbols.
fn sample_points(symbols: &BTreeSet<String>) -> Vec<HashMap<String, f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(PROBE_SEED);
    (0..PROBE_POINTS)
        .map(|i| {
            symbols
                .iter()
                .map(|s| {
                    let magnitude: f64 = rng.gen_range(0.2..2.5);
                    // Alternate signs so that abs(x) and x are told apart.
                    let value = if i % 2 == 0 { magnitude } else { -magnitude };
                    (s.clone(), value)
                })
                .collect()
        })
        .collect()
}

/// Compare two canonical expressions at deterministic sample points.
pub fn probe(a: &Canon, b: &Canon, symbols: &BTreeSet<String>) -> ProbeResult {
    let mut finite = 0;
    for point in sample_points(symbols) {
        let (va, vb) = (a.eval(&point), b.eval(&point));
        match (va.is_finite(), vb.is_finite()) {
            (true, true) => {
                if !approx_eq(va, vb) {
                    return ProbeResult::Disagree;
                }
                finite += 1;
            }
            (false, false) => {}
            _ => return ProbeResult::Disagree,
        }
    }
    if finite < MIN_FINITE_PROBES {
        ProbeResult::Inconclusive
    } else {
        ProbeResult::Agree
    }
}

/// Check whether `a - b` simplifies to exactly zero.
///
/// The difference is expanded into a polynomial. A zero polynomial confirms
/// equivalence; a nonzero polynomial over plain symbols refutes it. When
/// opaque atoms are involved, or expansion hits its limits, the two sides
/// are compared by numeric probing instead.
pub fn difference_is_zero(a: &Expr, b: &Expr) -> bool {
    let difference = canonical(&Expr::Sub(Box::new(a.clone()), Box::new(b.clone())));
    if let Some(poly) = expand(&difference) {
        if poly.is_zero() {
            return true;
        }
        if !poly.has_opaque_atoms() {
            return false;
        }
    }

    let mut symbols = a.symbols();
    symbols.extend(b.symbols());
    probe(&canonical(a), &canonical(b), &symbols) == ProbeResult::Agree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Expr {
        Expr::parse(s).unwrap()
    }

    fn canon(s: &str) -> Canon {
        canonical(&parse(s))
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(3.0), "3");
        assert_eq!(fmt_num(-2.0), "-2");
        assert_eq!(fmt_num(0.5), "0.5");
        assert_eq!(fmt_num(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_canonical_commutes() {
        assert!(canon("x + 1").same_as(&canon("1 + x")));
        assert!(canon("a*b*c").same_as(&canon("c*(b*a)")));
        assert!(canon("x - y").same_as(&canon("-y + x")));
    }

    #[test]
    fn test_canonical_combines_like_terms() {
        assert!(canon("x + x").same_as(&canon("2*x")));
        assert!(canon("x*x").same_as(&canon("x**2")));
        assert!(canon("x**2 * x**3").same_as(&canon("x**5")));
        assert!(canon("x - x").same_as(&Canon::Num(0.0)));
        assert!(canon("x / x").same_as(&Canon::Num(1.0)));
    }

    #[test]
    fn test_canonical_folds_constants() {
        assert!(canon("2 + 3 * 4").same_as(&Canon::Num(14.0)));
        assert!(canon("2**10").same_as(&Canon::Num(1024.0)));
        assert!(canon("sqrt(x)").same_as(&canon("x**(1/2)")));
        assert!(canon("E**x").same_as(&canon("exp(x)")));
        assert!(canon("log(exp(y))").same_as(&canon("y")));
    }

    #[test]
    fn test_symbolically_equal() {
        assert!(symbolically_equal(&parse("2*x + 1"), &parse("1 + x*2")));
        assert!(symbolically_equal(&parse("x/2"), &parse("0.5*x")));
        assert!(symbolically_equal(&parse("sqrt(2)**2"), &parse("2")));
        assert!(!symbolically_equal(&parse("x"), &parse("y")));
        // Needs expansion, which this stage does not do.
        assert!(!symbolically_equal(
            &parse("x**2 - 1"),
            &parse("(x-1)*(x+1)")
        ));
    }

    #[test]
    fn test_constant_expressions_compared_by_value() {
        assert!(symbolically_equal(&parse("sin(pi/6)"), &parse("0.5")));
        assert!(symbolically_equal(&parse("pi"), &parse("3.14159265358979")));
        assert!(!symbolically_equal(&parse("pi"), &parse("3.14")));
    }

    #[test]
    fn test_expand_polynomial() {
        let poly = expand(&canon("(x + 1)**2 - x**2 - 2*x - 1")).unwrap();
        assert!(poly.is_zero());
        assert!(!poly.has_opaque_atoms());
    }

    #[test]
    fn test_expand_respects_term_limit() {
        let wide = (0..80)
            .map(|i| format!("x{}", i))
            .collect::<Vec<_>>()
            .join(" + ");
        let expr = format!("({})**3", wide);
        // Too many terms to expand: the power is kept as a single opaque atom.
        let poly = expand(&canon(&expr)).unwrap();
        assert!(poly.has_opaque_atoms());
        assert_eq!(poly.len(), 1);
    }

    #[test]
    fn test_difference_is_zero_polynomial() {
        assert!(difference_is_zero(&parse("x**2 - 1"), &parse("(x-1)*(x+1)")));
        assert!(difference_is_zero(
            &parse("(a+b)**3"),
            &parse("a**3 + 3*a**2*b + 3*a*b**2 + b**3")
        ));
        assert!(!difference_is_zero(&parse("x**2 + 1"), &parse("(x+1)**2")));
    }

    #[test]
    fn test_difference_is_zero_laurent() {
        assert!(difference_is_zero(&parse("(x**2 + x)/x"), &parse("x + 1")));
    }

    #[test]
    fn test_difference_is_zero_opaque_atoms() {
        assert!(difference_is_zero(
            &parse("sin((x+1)**2)"),
            &parse("sin(x**2 + 2*x + 1)")
        ));
        assert!(difference_is_zero(
            &parse("sin(x)**2 + cos(x)**2"),
            &parse("1")
        ));
        assert!(!difference_is_zero(&parse("sin(x)"), &parse("cos(x)")));
    }

    #[test]
    fn test_probe_distinguishes_abs() {
        let symbols: BTreeSet<String> = ["x".to_string()].into_iter().collect();
        assert_eq!(
            probe(&canon("abs(x)"), &canon("x"), &symbols),
            ProbeResult::Disagree
        );
        assert_eq!(
            probe(&canon("abs(x)"), &canon("sqrt(x**2)"), &symbols),
            ProbeResult::Agree
        );
    }

    #[test]
    fn test_probe_domain_mismatch_disagrees() {
        let symbols: BTreeSet<String> = ["x".to_string()].into_iter().collect();
        assert_eq!(
            probe(&canon("log(x**2)"), &canon("2*log(x)"), &symbols),
            ProbeResult::Disagree
        );
    }

    #[test]
    fn test_probe_inconclusive_when_nowhere_finite() {
        let symbols: BTreeSet<String> = ["x".to_string()].into_iter().collect();
        assert_eq!(
            probe(&canon("log(-abs(x) - 1)"), &canon("log(-abs(x) - 2)"), &symbols),
            ProbeResult::Inconclusive
        );
    }
}
