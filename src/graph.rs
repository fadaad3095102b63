//! Program graph data types.
//!
//! A program is a set of named blocks of nodes plus an ordered list of
//! parameter declarations. Execution starts at the `entry` block and
//! runs its nodes in order.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shape::Shape;

pub const ENTRY_BLOCK: &str = "entry";

/// Elementwise operation kind supported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Min,
    Max,
    Abs,
    Neg,
    Relu,
}

/// Static definition of an op: name and input arity.
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub op: OpKind,
    pub name: &'static str,
    pub inputs: usize,
}

pub const OPS: &[OpDef] = &[
    OpDef { op: OpKind::Add, name: "add", inputs: 2 },
    OpDef { op: OpKind::Sub, name: "sub", inputs: 2 },
    OpDef { op: OpKind::Mul, name: "mul", inputs: 2 },
    OpDef { op: OpKind::Min, name: "min", inputs: 2 },
    OpDef { op: OpKind::Max, name: "max", inputs: 2 },
    OpDef { op: OpKind::Abs, name: "abs", inputs: 1 },
    OpDef { op: OpKind::Neg, name: "neg", inputs: 1 },
    OpDef { op: OpKind::Relu, name: "relu", inputs: 1 },
];

static OP_DEFS: Lazy<HashMap<OpKind, OpDef>> =
    Lazy::new(|| OPS.iter().map(|def| (def.op, *def)).collect());

pub fn op_def(op: OpKind) -> &'static OpDef {
    OP_DEFS.get(&op).expect("every op kind has a definition")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    /// Constant tensor filled with a scalar.
    Fill { output: String, shape: Shape, value: f64 },
    /// Pop one value from the backend's streaming infeed channel.
    Infeed { output: String, shape: Shape },
    Op {
        op: OpKind,
        inputs: Vec<String>,
        output: String,
    },
    /// Names the program result. Must be the entry block's final node.
    Return { input: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub index: usize,
    pub uuid: Uuid,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }
}

/// Declared unbound parameter of a program. Parameters are bound to
/// device handles positionally, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub shape: Shape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramGraph {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub blocks: HashMap<String, Block>,
    next_index: usize,
}

impl ProgramGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            blocks: HashMap::new(),
            next_index: 0,
        }
    }

    pub fn add_param(&mut self, name: impl Into<String>, shape: Shape) {
        self.params.push(ParamDecl {
            name: name.into(),
            shape,
        });
    }

    pub fn add_block(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.blocks.entry(name.clone()).or_insert_with(|| Block::new(name));
    }

    pub fn add_node(&mut self, block: &str, kind: NodeKind) -> Result<()> {
        let block = self
            .blocks
            .get_mut(block)
            .ok_or_else(|| anyhow!("missing block: {}", block))?;
        let node = Node {
            index: self.next_index,
            uuid: Uuid::new_v4(),
            kind,
        };
        self.next_index += 1;
        block.nodes.push(node);
        Ok(())
    }

    pub fn block(&self, name: &str) -> Result<&Block> {
        self.blocks
            .get(name)
            .ok_or_else(|| anyhow!("missing block: {}", name))
    }

    /// Declared streaming-infeed shapes, scanning every block's node list
    /// in a deterministic order.
    pub fn infeed_shapes(&self) -> Vec<Shape> {
        let mut names = self.blocks.keys().cloned().collect::<Vec<_>>();
        names.sort();
        let mut shapes = Vec::new();
        for name in names {
            let block = &self.blocks[&name];
            for node in &block.nodes {
                if let NodeKind::Infeed { shape, .. } = &node.kind {
                    shapes.push(shape.clone());
                }
            }
        }
        shapes
    }

    /// Structural validation run before a backend accepts the program.
    pub fn validate(&self) -> Result<()> {
        let mut param_names = HashSet::new();
        for param in &self.params {
            if !param_names.insert(param.name.as_str()) {
                return Err(anyhow!("duplicate parameter name: {}", param.name));
            }
        }
        let entry = self.block(ENTRY_BLOCK)?;
        match entry.nodes.last() {
            Some(Node {
                kind: NodeKind::Return { .. },
                ..
            }) => {}
            _ => return Err(anyhow!("entry block must end with a return node")),
        }
        for block in self.blocks.values() {
            for node in &block.nodes {
                match &node.kind {
                    NodeKind::Op { op, inputs, .. } => {
                        let def = op_def(*op);
                        if inputs.len() != def.inputs {
                            return Err(anyhow!(
                                "op {} expects {} inputs, got {}",
                                def.name,
                                def.inputs,
                                inputs.len()
                            ));
                        }
                    }
                    NodeKind::Return { .. } => {
                        if block.name == ENTRY_BLOCK
                            && node.index != entry.nodes.last().map(|n| n.index).unwrap_or(0)
                        {
                            return Err(anyhow!("entry block has a return before its final node"));
                        }
                    }
                    NodeKind::Fill { .. } | NodeKind::Infeed { .. } => {}
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

pub fn describe_node(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Fill { output, shape, value } => {
            format!("fill {} {} = {}", output, shape, value)
        }
        NodeKind::Infeed { output, shape } => format!("infeed {} {}", output, shape),
        NodeKind::Op { op, inputs, output } => {
            format!("op {}({}) >> {}", op_def(*op).name, inputs.join(","), output)
        }
        NodeKind::Return { input } => format!("return {}", input),
    }
}
