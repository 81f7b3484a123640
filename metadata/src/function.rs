use types::schema::Type;

/// A named value visible through a schema (or the host-parameter provider).
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    name: String,
    ty: Type,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        VariableDecl {
            name: name.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }
}

/// One overload of a scalar function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Identifies the implementation of the overload.
    definition_id: u64,
    name: String,
    parameters: Vec<Type>,
    return_type: Type,
}

impl FunctionDecl {
    pub fn new(
        definition_id: u64,
        name: impl Into<String>,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> Self {
        FunctionDecl {
            definition_id,
            name: name.into(),
            parameters,
            return_type,
        }
    }

    pub fn definition_id(&self) -> u64 {
        self.definition_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    pub fn return_type(&self) -> Type {
        self.return_type
    }
}

/// One overload of an aggregate function.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFunctionDecl {
    definition_id: u64,
    name: String,
    parameters: Vec<Type>,
    return_type: Type,
}

impl AggregateFunctionDecl {
    pub fn new(
        definition_id: u64,
        name: impl Into<String>,
        parameters: Vec<Type>,
        return_type: Type,
    ) -> Self {
        AggregateFunctionDecl {
            definition_id,
            name: name.into(),
            parameters,
            return_type,
        }
    }

    pub fn definition_id(&self) -> u64 {
        self.definition_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    pub fn return_type(&self) -> Type {
        self.return_type
    }
}
