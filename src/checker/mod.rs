//! Answer equivalence checking.
//!
//! `answer` dispatches on the question's answer type. Formula answers go
//! through `normalize` (LaTeX-like input to algebra syntax), `expr` (parsing)
//! and `symbolic` (canonical forms, expansion, numeric probing).

pub mod answer;
pub mod expr;
pub mod normalize;
pub mod symbolic;

pub use answer::{check_answer, check_answer_detailed, AnswerChecker, CheckerConfig, Stage, Verdict};
pub use expr::{Expr, ExprError};
pub use normalize::normalize;
pub use symbolic::{difference_is_zero, symbolically_equal};
