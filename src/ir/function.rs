//! Function bundles: parameters, intermediate bindings, return expression.

use super::expr::Expression;
use super::symbol::Ident;

/// The shape of a parameter's type: scalar, vec2, vec3, or a struct with named fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// A single real number.
    Scalar,
    /// A 2D vector, components `x`, `y`.
    Vec2,
    /// A 3D vector, components `x`, `y`, `z`.
    Vec3,
    /// A struct with named fields, each itself a (non-struct) type.
    Struct(Vec<(Ident, ParamType)>),
}

impl ParamType {
    /// The component field names this type exposes, in declaration order.
    ///
    /// Scalars expose a single synthetic `"default"` component, so
    /// callers can treat every parameter uniformly as "a set of
    /// differentiable components" without special-casing scalars.
    #[must_use]
    pub fn components(&self) -> Vec<Ident> {
        match self {
            ParamType::Scalar => vec![super::symbol::intern("default")],
            ParamType::Vec2 => vec![super::symbol::intern("x"), super::symbol::intern("y")],
            ParamType::Vec3 => vec![
                super::symbol::intern("x"),
                super::symbol::intern("y"),
                super::symbol::intern("z"),
            ],
            ParamType::Struct(fields) => fields.iter().map(|(name, _)| *name).collect(),
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name.
    pub name: Ident,
    /// Parameter type shape.
    pub ty: ParamType,
    /// Whether gradients must be produced for this parameter's components.
    pub differentiable: bool,
}

/// One component of a differentiable parameter, e.g. `(u, x)` for `u.x`,
/// or `(a, default)` for a scalar parameter `a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentPath {
    /// The carrying parameter's name.
    pub param: Ident,
    /// The field within that parameter (`"default"` for scalars).
    pub field: Ident,
}

/// A DSL function, as received from the (external) parser/type-checker.
#[derive(Debug, Clone)]
pub struct Function {
    /// Ordered parameter list.
    pub params: Vec<Param>,
    /// Ordered intermediate `(name, expr)` bindings, forward-use only.
    pub bindings: Vec<(Ident, Expression)>,
    /// The function's return expression.
    pub ret: Expression,
}

impl Function {
    /// All differentiable components across all parameters, in parameter
    /// then field declaration order.
    #[must_use]
    pub fn differentiable_components(&self) -> Vec<ComponentPath> {
        self.params
            .iter()
            .filter(|p| p.differentiable)
            .flat_map(|p| {
                p.ty.components()
                    .into_iter()
                    .map(move |field| ComponentPath { param: p.name, field })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_components_is_single_default() {
        let components = ParamType::Scalar.components();
        assert_eq!(components.len(), 1);
        assert_eq!(&*components[0].as_str(), "default");
    }

    #[test]
    fn vec2_components_are_x_y() {
        let components = ParamType::Vec2.components();
        assert_eq!(&*components[0].as_str(), "x");
        assert_eq!(&*components[1].as_str(), "y");
    }
}
