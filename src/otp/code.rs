//! Code generation.

use rand::{rngs::OsRng, Rng};

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform six-digit codes from the OS random source.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        OsRng.gen_range(CODE_MIN..=CODE_MAX).to_string()
    }
}

/// Always returns the same code. Used by demos and tests that need to know
/// the delivered value.
#[derive(Clone, Debug)]
pub struct FixedCodeGenerator {
    code: String,
}

impl FixedCodeGenerator {
    #[must_use]
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
        }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self) -> String {
        self.code.clone()
    }
}
