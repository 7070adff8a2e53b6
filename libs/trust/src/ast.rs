//! Abstract syntax tree produced by the schema grammar
//!
//! Pattern and rule identifiers stay textual here; the compiler assigns
//! numeric tags in a later phase. Component literals are stored in their
//! encoded TLV form so automaton matching is byte equality.

/// One element of a rule's name pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameUnit {
    /// A literal component in encoded form
    Value(Vec<u8>),
    /// A pattern; names starting with `_` are temporary
    Pattern(String),
    /// A reference to another rule, `#` included
    RuleRef(String),
}

/// An argument of a user-function invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FnArg {
    Value(Vec<u8>),
    Pattern(String),
}

/// One alternative satisfying a constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsOption {
    Value(Vec<u8>),
    Pattern(String),
    Fn { name: String, args: Vec<FnArg> },
}

/// `pattern: option | option | ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConstraint {
    pub pattern: String,
    pub options: Vec<ConsOption>,
}

/// A single rule definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Rule identifier, `#` included
    pub id: String,
    pub name: Vec<NameUnit>,
    /// Component constraints in disjunctive normal form: a list of
    /// conjunction sets, any one of which may hold
    pub comp_cons: Vec<Vec<TagConstraint>>,
    /// Acceptable signer rules, any one of which may sign
    pub sign_cons: Vec<String>,
}

/// A parsed schema file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LvsFile {
    pub rules: Vec<Rule>,
}
