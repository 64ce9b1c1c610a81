use crate::options::Options;
use crate::render::Fault;
use crate::value::{List, Map};
use crate::Value;

/// The operand stack of the interpreter.
#[derive(Debug, Default)]
pub struct Stack {
    operands: Vec<Operand>,
}

#[derive(Debug)]
pub enum Operand {
    /// A value
    Value(Value),

    /// The options of a `write_opt`, filled by `store_option`
    Options(Box<Options>),

    /// The named arguments of a `new_box_args`, filled by `store_arg`
    Args(Map<String, Value>),
}

impl Stack {
    #[inline]
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn push(&mut self, value: Value) {
        self.operands.push(Operand::Value(value));
    }

    pub fn push_operand(&mut self, operand: Operand) {
        self.operands.push(operand);
    }

    pub fn pop(&mut self) -> Result<Value, Fault> {
        match self.operands.pop() {
            Some(Operand::Value(value)) => Ok(value),
            Some(other) => Err(Fault::new(format!("expected value, found {}", other.human()))),
            None => Err(underflow()),
        }
    }

    /// Pop `n` values, returning them in the order they were pushed.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Fault> {
        let mut values = (0..n).map(|_| self.pop()).collect::<Result<Vec<_>, _>>()?;
        values.reverse();
        Ok(values)
    }

    pub fn pop_options(&mut self) -> Result<Box<Options>, Fault> {
        match self.operands.pop() {
            Some(Operand::Options(options)) => Ok(options),
            Some(other) => Err(Fault::new(format!(
                "expected options, found {}",
                other.human()
            ))),
            None => Err(underflow()),
        }
    }

    pub fn pop_args(&mut self) -> Result<Map<String, Value>, Fault> {
        match self.operands.pop() {
            Some(Operand::Args(args)) => Ok(args),
            Some(other) => Err(Fault::new(format!(
                "expected arguments, found {}",
                other.human()
            ))),
            None => Err(underflow()),
        }
    }

    pub fn top_mut(&mut self) -> Result<&mut Value, Fault> {
        match self.operands.last_mut() {
            Some(Operand::Value(value)) => Ok(value),
            Some(other) => Err(Fault::new(format!("expected value, found {}", other.human()))),
            None => Err(underflow()),
        }
    }

    pub fn top_options_mut(&mut self) -> Result<&mut Options, Fault> {
        match self.operands.last_mut() {
            Some(Operand::Options(options)) => Ok(&mut **options),
            Some(other) => Err(Fault::new(format!(
                "expected options, found {}",
                other.human()
            ))),
            None => Err(underflow()),
        }
    }

    pub fn top_args_mut(&mut self) -> Result<&mut Map<String, Value>, Fault> {
        match self.operands.last_mut() {
            Some(Operand::Args(args)) => Ok(args),
            Some(other) => Err(Fault::new(format!(
                "expected arguments, found {}",
                other.human()
            ))),
            None => Err(underflow()),
        }
    }

    pub fn top_list_mut(&mut self) -> Result<&mut List<Value>, Fault> {
        match self.top_mut()? {
            Value::List(list) => Ok(list),
            other => Err(Fault::new(format!("expected list, found {}", other.human()))),
        }
    }
}

impl Operand {
    fn human(&self) -> &'static str {
        match self {
            Operand::Value(value) => value.human(),
            Operand::Options(_) => "options",
            Operand::Args(_) => "arguments",
        }
    }
}

fn underflow() -> Fault {
    Fault::new("operand stack underflow")
}
