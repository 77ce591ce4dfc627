// A flat Bril program: functions holding labels, constants, value ops and effect ops.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::source_map::SourceMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
    /// Instruction -> AST node attribution; not part of the Bril encoding
    #[serde(skip)]
    pub source_map: SourceMap,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn main(&self) -> Option<&Function> {
        self.function("main")
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                out.push(String::new());
            }
            out.extend(func.to_lines());
        }
        out
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<Type>,
    #[serde(default)]
    pub instrs: Vec<Instr>,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<Argument>, return_type: Option<Type>) -> Self {
        Self {
            name: name.into(),
            args,
            return_type,
            instrs: Vec::new(),
        }
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.instrs.len() + 2);
        let mut header = format!("@{}", self.name);
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            header.push_str(&format!("({})", args.join(", ")));
        }
        if let Some(ty) = self.return_type {
            header.push_str(&format!(": {ty}"));
        }
        out.push(format!("{header} {{"));
        for ins in &self.instrs {
            match ins {
                Instr::Label { .. } => out.push(format!("{ins}")),
                _ => out.push(format!("  {ins}")),
            }
        }
        out.push("}".to_string());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Bool,
    Float,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Type::Int => "int",
            Type::Bool => "bool",
            Type::Float => "float",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            // Debug keeps the fractional part (`1.0`, not `1`)
            Literal::Float(x) => write!(f, "{x:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawInstr", try_from = "RawInstr")]
pub enum Instr {
    /// `.<name>:`
    Label { name: String },

    /// `dest: type = const value`
    Constant {
        dest: String,
        ty: Type,
        value: Literal,
    },

    /// `dest: type = op args...`
    Value {
        op: ValueOp,
        dest: String,
        ty: Type,
        args: Vec<String>,
        funcs: Vec<String>,
    },

    /// `op args...` with no destination (branch, jump, call, print, return)
    Effect {
        op: EffectOp,
        args: Vec<String>,
        funcs: Vec<String>,
        labels: Vec<String>,
    },
}

impl Instr {
    pub fn dest(&self) -> Option<&str> {
        match self {
            Instr::Constant { dest, .. } | Instr::Value { dest, .. } => Some(dest),
            Instr::Label { .. } | Instr::Effect { .. } => None,
        }
    }

    pub fn ty(&self) -> Option<Type> {
        match self {
            Instr::Constant { ty, .. } | Instr::Value { ty, .. } => Some(*ty),
            Instr::Label { .. } | Instr::Effect { .. } => None,
        }
    }

    pub fn args(&self) -> &[String] {
        match self {
            Instr::Value { args, .. } | Instr::Effect { args, .. } => args,
            Instr::Label { .. } | Instr::Constant { .. } => &[],
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            Instr::Effect { labels, .. } => labels,
            _ => &[],
        }
    }

    pub fn funcs(&self) -> &[String] {
        match self {
            Instr::Value { funcs, .. } | Instr::Effect { funcs, .. } => funcs,
            _ => &[],
        }
    }

    pub fn label_name(&self) -> Option<&str> {
        match self {
            Instr::Label { name } => Some(name),
            _ => None,
        }
    }

    /// The opcode as it appears in Bril (`const`, `id`, `br`, ...). Labels have none.
    pub fn opcode(&self) -> Option<&'static str> {
        match self {
            Instr::Label { .. } => None,
            Instr::Constant { .. } => Some("const"),
            Instr::Value { op, .. } => Some(op.as_str()),
            Instr::Effect { op, .. } => Some(op.as_str()),
        }
    }

    /// `br`, `jmp` and `ret` end a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Effect {
                op: EffectOp::Br | EffectOp::Jmp | EffectOp::Ret,
                ..
            }
        )
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label { name } => write!(f, ".{name}:"),
            Instr::Constant { dest, ty, value } => write!(f, "{dest}: {ty} = const {value};"),
            Instr::Value {
                op,
                dest,
                ty,
                args,
                funcs,
            } => {
                write!(f, "{dest}: {ty} = {op}")?;
                write_operands(f, args, funcs, &[])?;
                write!(f, ";")
            }
            Instr::Effect {
                op,
                args,
                funcs,
                labels,
            } => {
                write!(f, "{op}")?;
                write_operands(f, args, funcs, labels)?;
                write!(f, ";")
            }
        }
    }
}

fn write_operands(
    f: &mut fmt::Formatter<'_>,
    args: &[String],
    funcs: &[String],
    labels: &[String],
) -> fmt::Result {
    for func in funcs {
        write!(f, " @{func}")?;
    }
    for arg in args {
        write!(f, " {arg}")?;
    }
    for label in labels {
        write!(f, " .{label}")?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOp {
    Id,
    Call,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Not,
    And,
    Or,
    Fadd,
    Fsub,
    Fmul,
    Fdiv,
    Feq,
    Flt,
    Fgt,
    Fle,
    Fge,
}

impl ValueOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueOp::Id => "id",
            ValueOp::Call => "call",
            ValueOp::Add => "add",
            ValueOp::Sub => "sub",
            ValueOp::Mul => "mul",
            ValueOp::Div => "div",
            ValueOp::Eq => "eq",
            ValueOp::Lt => "lt",
            ValueOp::Gt => "gt",
            ValueOp::Le => "le",
            ValueOp::Ge => "ge",
            ValueOp::Not => "not",
            ValueOp::And => "and",
            ValueOp::Or => "or",
            ValueOp::Fadd => "fadd",
            ValueOp::Fsub => "fsub",
            ValueOp::Fmul => "fmul",
            ValueOp::Fdiv => "fdiv",
            ValueOp::Feq => "feq",
            ValueOp::Flt => "flt",
            ValueOp::Fgt => "fgt",
            ValueOp::Fle => "fle",
            ValueOp::Fge => "fge",
        }
    }
}

impl FromStr for ValueOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "id" => ValueOp::Id,
            "call" => ValueOp::Call,
            "add" => ValueOp::Add,
            "sub" => ValueOp::Sub,
            "mul" => ValueOp::Mul,
            "div" => ValueOp::Div,
            "eq" => ValueOp::Eq,
            "lt" => ValueOp::Lt,
            "gt" => ValueOp::Gt,
            "le" => ValueOp::Le,
            "ge" => ValueOp::Ge,
            "not" => ValueOp::Not,
            "and" => ValueOp::And,
            "or" => ValueOp::Or,
            "fadd" => ValueOp::Fadd,
            "fsub" => ValueOp::Fsub,
            "fmul" => ValueOp::Fmul,
            "fdiv" => ValueOp::Fdiv,
            "feq" => ValueOp::Feq,
            "flt" => ValueOp::Flt,
            "fgt" => ValueOp::Fgt,
            "fle" => ValueOp::Fle,
            "fge" => ValueOp::Fge,
            other => return Err(format!("unknown value opcode '{other}'")),
        };
        Ok(op)
    }
}

impl fmt::Display for ValueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectOp {
    Br,
    Jmp,
    Call,
    Print,
    Ret,
    Nop,
}

impl EffectOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectOp::Br => "br",
            EffectOp::Jmp => "jmp",
            EffectOp::Call => "call",
            EffectOp::Print => "print",
            EffectOp::Ret => "ret",
            EffectOp::Nop => "nop",
        }
    }
}

impl FromStr for EffectOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s {
            "br" => EffectOp::Br,
            "jmp" => EffectOp::Jmp,
            "call" => EffectOp::Call,
            "print" => EffectOp::Print,
            "ret" => EffectOp::Ret,
            "nop" => EffectOp::Nop,
            other => return Err(format!("unknown effect opcode '{other}'")),
        };
        Ok(op)
    }
}

impl fmt::Display for EffectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire shape of one Bril instruction: every field optional, as in the JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawInstr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dest: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    ty: Option<Type>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    funcs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
}

impl From<Instr> for RawInstr {
    fn from(instr: Instr) -> Self {
        match instr {
            Instr::Label { name } => RawInstr {
                label: Some(name),
                ..Default::default()
            },
            Instr::Constant { dest, ty, value } => RawInstr {
                op: Some("const".to_string()),
                dest: Some(dest),
                ty: Some(ty),
                value: Some(value),
                ..Default::default()
            },
            Instr::Value {
                op,
                dest,
                ty,
                args,
                funcs,
            } => RawInstr {
                op: Some(op.as_str().to_string()),
                dest: Some(dest),
                ty: Some(ty),
                args: Some(args),
                funcs,
                ..Default::default()
            },
            Instr::Effect {
                op,
                args,
                funcs,
                labels,
            } => RawInstr {
                op: Some(op.as_str().to_string()),
                args: Some(args),
                funcs,
                labels,
                ..Default::default()
            },
        }
    }
}

impl TryFrom<RawInstr> for Instr {
    type Error = String;

    fn try_from(raw: RawInstr) -> Result<Self, Self::Error> {
        if let Some(name) = raw.label {
            return Ok(Instr::Label { name });
        }
        let op = raw.op.ok_or("instruction has neither 'label' nor 'op'")?;
        let args = raw.args.unwrap_or_default();

        match (op.as_str(), raw.dest) {
            ("const", Some(dest)) => Ok(Instr::Constant {
                dest,
                ty: raw.ty.ok_or("const without 'type'")?,
                value: raw.value.ok_or("const without 'value'")?,
            }),
            ("const", None) => Err("const without 'dest'".to_string()),
            (op, Some(dest)) => Ok(Instr::Value {
                op: op.parse()?,
                dest,
                ty: raw.ty.ok_or_else(|| format!("'{op}' without 'type'"))?,
                args,
                funcs: raw.funcs,
            }),
            (op, None) => Ok(Instr::Effect {
                op: op.parse()?,
                args,
                funcs: raw.funcs,
                labels: raw.labels,
            }),
        }
    }
}

/// Encode a program in the Bril JSON format (pretty-printed).
pub fn to_json(program: &Program) -> serde_json::Result<String> {
    serde_json::to_string_pretty(program)
}

/// Decode a Bril JSON program. The result carries an empty source map.
pub fn from_json(text: &str) -> serde_json::Result<Program> {
    serde_json::from_str(text)
}
