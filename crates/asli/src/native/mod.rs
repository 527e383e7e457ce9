//! The concrete interpreter backend.
//!
//! Every value is fully determined, `UNKNOWN` collapses to the type's base
//! value, and [`Backend::choice`] simply reads the boolean. This is the
//! backend the CLI runs with and the reference against which other
//! backends are compared.

mod ops;
mod primitives;
mod value;

pub use value::NativeValue;

use num_bigint::BigInt;

use crate::{
    ast::{BinOp, Literal, UnOp},
    backend::{Backend, PrimitiveFn},
    bitvector::Bitvector,
    error::{AslError, AslErrorKind},
};

fn fail(msg: String) -> AslError {
    AslError::no_pos(AslErrorKind::OperationFailed(msg))
}

/// The stateless concrete backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn expect_bitvector<'a>(&self, v: &'a NativeValue, context: &str) -> Result<&'a Bitvector, AslError> {
        v.as_bitvector()
            .ok_or_else(|| fail(format!("{context} applied to a {}", v.kind())))
    }

    /// Converts one evaluated slice to a concrete `(offset, length)` pair.
    fn concrete_slice(&self, slice: &(NativeValue, NativeValue)) -> Result<(usize, usize), AslError> {
        let to_usize = |v: &NativeValue, what: &str| {
            self.v_to_int(v)
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| fail(format!("bitvector slice {what} {} is not a natural number", self.debug_value(v))))
        };
        Ok((to_usize(&slice.0, "offset")?, to_usize(&slice.1, "length")?))
    }
}

impl Backend for NativeBackend {
    type Value = NativeValue;

    fn v_of_literal(&mut self, lit: &Literal) -> NativeValue {
        match lit {
            Literal::Bool(b) => NativeValue::Bool(*b),
            Literal::Int(i) => NativeValue::Int(i.clone()),
            Literal::Real(r) => NativeValue::Real(r.clone()),
            Literal::String(s) => NativeValue::String(s.clone()),
            Literal::BitVector(bv) => NativeValue::BitVector(bv.clone()),
        }
    }

    fn v_of_int(&mut self, i: i64) -> NativeValue {
        NativeValue::Int(BigInt::from(i))
    }

    fn v_to_int(&self, v: &NativeValue) -> Option<i64> {
        use num_traits::ToPrimitive;
        v.as_int().and_then(BigInt::to_i64)
    }

    fn binop(&mut self, op: BinOp, lhs: NativeValue, rhs: NativeValue) -> Result<NativeValue, AslError> {
        ops::binop(op, lhs, rhs)
    }

    fn unop(&mut self, op: UnOp, v: NativeValue) -> Result<NativeValue, AslError> {
        ops::unop(op, v)
    }

    fn read_from_bitvector(
        &mut self,
        v: &NativeValue,
        slices: &[(NativeValue, NativeValue)],
    ) -> Result<NativeValue, AslError> {
        let bv = self.expect_bitvector(v, "bit slicing")?;
        let mut parts = Vec::with_capacity(slices.len());
        for slice in slices {
            let (offset, length) = self.concrete_slice(slice)?;
            parts.push(bv.extract(offset, length)?);
        }
        Ok(NativeValue::BitVector(Bitvector::concat(&parts)))
    }

    fn write_to_bitvector(
        &mut self,
        slices: &[(NativeValue, NativeValue)],
        src: NativeValue,
        dst: NativeValue,
    ) -> Result<NativeValue, AslError> {
        let src = self.expect_bitvector(&src, "bit slice assignment")?.clone();
        let mut dst = self.expect_bitvector(&dst, "bit slice assignment")?.clone();
        let concrete: Vec<(usize, usize)> = slices
            .iter()
            .map(|slice| self.concrete_slice(slice))
            .collect::<Result<_, _>>()?;
        let total: usize = concrete.iter().map(|(_, length)| length).sum();
        if src.len() != total {
            return Err(fail(format!(
                "cannot assign {} bits to slices of total width {total}",
                src.len()
            )));
        }
        // The first slice takes the most significant bits of the source.
        let mut consumed = 0;
        for (offset, length) in concrete {
            let part = src.extract(total - consumed - length, length)?;
            dst = dst.write(offset, length, &part)?;
            consumed += length;
        }
        Ok(NativeValue::BitVector(dst))
    }

    fn bitvector_length(&mut self, v: &NativeValue) -> Result<NativeValue, AslError> {
        let bv = self.expect_bitvector(v, "bitvector length")?;
        Ok(NativeValue::Int(BigInt::from(bv.len())))
    }

    fn concat_bitvectors(&mut self, parts: Vec<NativeValue>) -> Result<NativeValue, AslError> {
        let parts: Vec<Bitvector> = parts
            .iter()
            .map(|part| self.expect_bitvector(part, "bitvector concatenation").cloned())
            .collect::<Result<_, _>>()?;
        Ok(NativeValue::BitVector(Bitvector::concat(&parts)))
    }

    fn get_index(&mut self, index: usize, v: &NativeValue) -> Result<NativeValue, AslError> {
        match v {
            NativeValue::Vector(items) => items
                .get(index)
                .cloned()
                .ok_or_else(|| fail(format!("index {index} out of range for a vector of {}", items.len()))),
            other => Err(fail(format!("indexing applied to a {}", other.kind()))),
        }
    }

    fn set_index(&mut self, index: usize, element: NativeValue, v: NativeValue) -> Result<NativeValue, AslError> {
        match v {
            NativeValue::Vector(mut items) => {
                let len = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| fail(format!("index {index} out of range for a vector of {len}")))?;
                *slot = element;
                Ok(NativeValue::Vector(items))
            }
            other => Err(fail(format!("index assignment applied to a {}", other.kind()))),
        }
    }

    fn get_field(&mut self, name: &str, v: &NativeValue) -> Result<NativeValue, AslError> {
        match v {
            NativeValue::Record(fields) => fields
                .get(name)
                .cloned()
                .ok_or_else(|| fail(format!("record has no field {name}"))),
            other => Err(fail(format!("field access applied to a {}", other.kind()))),
        }
    }

    fn set_field(&mut self, name: &str, element: NativeValue, record: NativeValue) -> Result<NativeValue, AslError> {
        match record {
            NativeValue::Record(mut fields) => {
                let slot = fields
                    .get_mut(name)
                    .ok_or_else(|| fail(format!("record has no field {name}")))?;
                *slot = element;
                Ok(NativeValue::Record(fields))
            }
            other => Err(fail(format!("field assignment applied to a {}", other.kind()))),
        }
    }

    fn create_vector(&mut self, elements: Vec<NativeValue>) -> Result<NativeValue, AslError> {
        Ok(NativeValue::Vector(elements))
    }

    fn create_record(&mut self, fields: Vec<(String, NativeValue)>) -> Result<NativeValue, AslError> {
        Ok(NativeValue::Record(fields.into_iter().collect()))
    }

    fn is_undetermined(&self, _v: &NativeValue) -> bool {
        false
    }

    fn choice(&mut self, v: &NativeValue) -> Result<bool, AslError> {
        v.as_bool()
            .ok_or_else(|| fail(format!("branch decision on a {}", v.kind())))
    }

    fn ternary(&mut self, cond: NativeValue, v_true: NativeValue, v_false: NativeValue) -> Result<NativeValue, AslError> {
        Ok(if self.choice(&cond)? { v_true } else { v_false })
    }

    fn debug_value(&self, v: &NativeValue) -> String {
        v.to_string()
    }

    fn primitives() -> Vec<(crate::ast::FuncDecl, PrimitiveFn<Self>)> {
        primitives::table()
    }
}
