//! IR 打印
//!
//! Deterministic textual form of the IR, used for `--emit ir` and golden tests.

use super::{ClassUnit, Condition, InvokeKind, Instruction, Method, Operand, UnaryOperator, Variable};
use std::fmt;

impl fmt::Display for Variable {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.ty)
    }
}

impl fmt::Display for Operand {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Operand::Literal { value, ty } => write!(f, "{}.{}", value, ty),
            Operand::Variable(var) => write!(f, "{}", var),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Condition::Single(op) => write!(f, "{}", op),
            Condition::Compare { op, lhs, rhs } => write!(f, "{} {}.bool {}", lhs, op.symbol(), rhs),
        }
    }
}

fn write_args(
    f: &mut fmt::Formatter<'_>,
    args: &[Operand],
) -> fmt::Result {
    for arg in args {
        write!(f, ", {}", arg)?;
    }
    Ok(())
}

impl fmt::Display for Instruction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Instruction::Assign { dest, rhs } => write!(f, "{} :=.{} {}", dest, dest.ty, rhs),
            Instruction::BinaryOp { op, lhs, rhs, ty } => {
                write!(f, "{} {}.{} {}", lhs, op.symbol(), ty, rhs)
            }
            Instruction::UnaryOp { op, operand, ty } => match op {
                UnaryOperator::Not => write!(f, "!.{} {}", ty, operand),
            },
            Instruction::SingleOp(op) => write!(f, "{}", op),
            Instruction::NewObject { class } => write!(f, "new({}).{}", class, class),
            Instruction::NewArray { length, elem } => write!(f, "new(array, {}).array.{}", length, elem),
            Instruction::GetField { object, field } => {
                write!(f, "getfield({}, {}).{}", object, field, field.ty)
            }
            Instruction::PutField {
                object,
                field,
                value,
            } => write!(f, "putfield({}, {}, {}).V", object, field, value),
            Instruction::Invoke {
                kind,
                receiver,
                class,
                method,
                args,
                ret,
            } => {
                match kind {
                    InvokeKind::Virtual => write!(f, "invokevirtual(")?,
                    InvokeKind::Static => write!(f, "invokestatic(")?,
                    InvokeKind::Special => write!(f, "invokespecial(")?,
                }
                match receiver {
                    Some(receiver) => write!(f, "{}", receiver)?,
                    None => write!(f, "{}", class)?,
                }
                write!(f, ", \"{}\"", method)?;
                write_args(f, args)?;
                write!(f, ").{}", ret)
            }
            Instruction::ArrayLoad { array, index, ty } => {
                write!(f, "{}[{}].{}", array.name, index, ty)
            }
            Instruction::ArrayStore {
                array,
                index,
                value,
            } => write!(f, "{}[{}] :=.{} {}", array.name, index, value.ty(), value),
            Instruction::ArrayLength { array } => write!(f, "arraylength({}).i32", array),
            Instruction::Return(None) => write!(f, "ret.V"),
            Instruction::Return(Some(value)) => write!(f, "ret.{} {}", value.ty(), value),
            Instruction::Label(name) => write!(f, "{}:", name),
            Instruction::Goto(label) => write!(f, "goto {}", label),
            Instruction::CondBranch { cond, label } => write!(f, "if ({}) goto {}", cond, label),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_constructor {
            write!(f, "    .construct {}(", self.name)?;
        } else {
            write!(f, "    .method ")?;
            if self.is_public {
                write!(f, "public ")?;
            }
            if self.is_static {
                write!(f, "static ")?;
            }
            write!(f, "{}(", self.name)?;
        }
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        writeln!(f, "{}).{} {{", params.join(", "), self.return_type)?;

        for instr in &self.instructions {
            match instr {
                Instruction::Label(_) => writeln!(f, "    {}", instr)?,
                _ => writeln!(f, "        {};", instr)?,
            }
        }

        if self.has_registers() {
            let registers: Vec<String> = self
                .vars
                .iter()
                .filter_map(|(name, entry)| entry.register.map(|r| format!("{}={}", name, r)))
                .collect();
            writeln!(f, "        // registers: {}", registers.join(", "))?;
        }
        writeln!(f, "    }}")
    }
}

impl fmt::Display for ClassUnit {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "import {};", import)?;
        }
        match &self.super_class {
            Some(super_class) => writeln!(f, "{} extends {} {{", self.name, super_class)?,
            None => writeln!(f, "{} {{", self.name)?,
        }
        for field in &self.fields {
            writeln!(f, "    .field private {};", field)?;
        }
        for method in &self.methods {
            writeln!(f)?;
            write!(f, "{}", method)?;
        }
        writeln!(f, "}}")
    }
}
