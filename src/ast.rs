//! Data model for parsed snippets.
//!
//! A snippet is one [`Program`]: a flat statement list evaluated as a
//! single unit against the caller's namespace.

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A statement together with the source line it starts on, carried for
/// runtime diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assignment {
        name: String,
        value: Expr,
    },
    Expression(Expr),
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    List(Vec<Expr>),
    /// Map literal; entry order is source order, evaluation sorts keys.
    Map(Vec<(String, Expr)>),
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    /// Builtin call: `print(x)`, `quick_stats(xs)`
    FunctionCall {
        function: String,
        arguments: Vec<Expr>,
    },
    /// Module function call: `math.sqrt(2)`
    ModuleCall {
        module: String,
        function: String,
        arguments: Vec<Expr>,
    },
    /// Attribute access: `math.pi`, or key access on a map-valued variable
    Field {
        target: Box<Expr>,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    And,
    Or,
}
