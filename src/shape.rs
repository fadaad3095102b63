use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::tensor::{numel, DType};

/// Declared value shape: element dtype plus dimensions. Rendered and
/// parsed in the `f32[2,3]` text form; `f32[]` is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub dtype: DType,
    pub dims: Vec<usize>,
}

impl Shape {
    pub fn new(dtype: DType, dims: Vec<usize>) -> Self {
        Self { dtype, dims }
    }

    pub fn scalar(dtype: DType) -> Self {
        Self {
            dtype,
            dims: Vec::new(),
        }
    }

    pub fn numel(&self) -> usize {
        numel(&self.dims)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let (dtype_str, rest) = match trimmed.find('[') {
            Some(start) => (&trimmed[..start], &trimmed[start..]),
            None => (trimmed, ""),
        };
        let dtype = DType::from_ident(dtype_str.trim())?;
        let mut dims = Vec::new();
        if !rest.is_empty() {
            let end = rest
                .find(']')
                .ok_or_else(|| anyhow!("shape {} is missing closing bracket", trimmed))?;
            let dim_str = &rest[1..end];
            for part in dim_str.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let dim = part
                    .parse::<usize>()
                    .map_err(|err| anyhow!("invalid dimension {} in shape {}: {}", part, trimmed, err))?;
                dims.push(dim);
            }
        }
        Ok(Self { dtype, dims })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = self
            .dims
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}[{}]", self.dtype.ident(), dims)
    }
}
