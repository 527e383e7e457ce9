//! The static view handed over by the external type checker.
//!
//! The evaluator consults it for three things: resolving named types to
//! their declared structure, the values of enumeration labels and other
//! named constants, and the subtype relation that drives try/catch
//! matching.

use num_bigint::BigInt;

use crate::{
    ast::{IntConstraint, Literal, Ty, TypeDecl},
    env::IdMap,
    error::{AslError, AslErrorKind},
};

/// Read-only static environment: declared types and named constants.
#[derive(Debug, Default)]
pub struct StaticEnv {
    declared_types: IdMap<TypeDecl>,
    /// Values of enumeration labels and other constants recorded during
    /// elaboration.
    pub constant_values: IdMap<Literal>,
}

impl StaticEnv {
    /// Registers a type declaration. Enumeration labels are recorded as
    /// integer constants in declaration order.
    pub fn declare_type(&mut self, decl: TypeDecl) {
        if let Ty::Enum(labels) = &decl.ty {
            for (i, label) in labels.iter().enumerate() {
                self.constant_values
                    .insert(label.clone(), Literal::Int(BigInt::from(i)));
            }
        }
        self.declared_types.insert(decl.name.clone(), decl);
    }

    /// Looks up a declared type by name.
    #[must_use]
    pub fn declared_type(&self, name: &str) -> Option<&TypeDecl> {
        self.declared_types.get(name)
    }

    /// Resolves a type to its declared structure, following named
    /// references.
    pub fn structure(&self, ty: &Ty) -> Result<Ty, AslError> {
        let mut current = ty.clone();
        // Bounded walk; declaration chains are short and acyclic, but a
        // corrupt input must not loop forever.
        for _ in 0..64 {
            match current {
                Ty::Named(name) => match self.declared_types.get(&name) {
                    Some(decl) => current = decl.ty.clone(),
                    None => {
                        return Err(AslError::no_pos(AslErrorKind::UndefinedIdentifier(name)));
                    }
                },
                other => return Ok(other),
            }
        }
        Err(AslError::no_pos(AslErrorKind::UnrespectedParserInvariant(
            "cyclic type declaration".to_owned(),
        )))
    }

    /// The subtype relation used for catcher matching: does a value of
    /// type `ty` satisfy an annotation of type `super_ty`?
    ///
    /// Named types match by name or through their declared supertype
    /// chain. Record and exception types are nominal: two declarations
    /// with identical fields are still distinct. Everything else is
    /// resolved to its structure and compared, with every integer type
    /// satisfying the unconstrained integer.
    #[must_use]
    pub fn subtype_satisfies(&self, ty: &Ty, super_ty: &Ty) -> bool {
        if ty == super_ty {
            return true;
        }
        if let (Ty::Named(name), Ty::Named(super_name)) = (ty, super_ty) {
            let mut current = name.as_str();
            for _ in 0..64 {
                if current == super_name {
                    return true;
                }
                match self.declared_types.get(current).and_then(|d| d.supertype.as_deref()) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
        }
        match (self.structure(ty), self.structure(super_ty)) {
            (Ok(a), Ok(b)) => match (&a, &b) {
                (Ty::Record(_) | Ty::Exception(_), _) | (_, Ty::Record(_) | Ty::Exception(_)) => false,
                (Ty::Int(_), Ty::Int(IntConstraint::Unconstrained)) => true,
                _ => a == b,
            },
            _ => false,
        }
    }
}
