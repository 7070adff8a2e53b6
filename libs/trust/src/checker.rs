//! # Schema Checker
//!
//! ## Purpose
//!
//! Runtime matcher over the compiled automaton. A depth-first backtracking
//! walk yields every (node, environment) pair reachable at the end of a
//! name. Value edges are tried first (at most one can match a component),
//! then pattern edges in stored order; a pattern edge is taken when its tag
//! is already bound to the same component, or unbound with its constraint
//! set satisfied. Bindings push on entry and pop on backtrack.
//!
//! `check` decides signing: a packet name may be signed by a key name when
//! some terminal for the packet lists a signing node the key name reaches
//! under an environment extending the packet's.

use std::collections::HashMap;

use bytes::Bytes;
use types::varnum::{parse_tl_num, parse_uint};
use types::Name;

use crate::error::{LvsError, LvsResult};
use crate::model::{ConstraintOption, LvsModel, PatternConstraint, UserFnArg};

/// User function: (component wire bytes, resolved arguments) -> bool
///
/// An argument is `None` when it references a pattern with no binding yet.
pub type UserFn = Box<dyn Fn(&[u8], &[Option<&[u8]>]) -> bool + Send + Sync>;

/// A schema loaded with its user functions
pub struct Checker {
    model: LvsModel,
    fns: HashMap<String, UserFn>,
    symbols: HashMap<u64, String>,
}

impl Checker {
    /// Load a model; every user function the schema names must be provided
    pub fn new(model: LvsModel, fns: HashMap<String, UserFn>) -> LvsResult<Self> {
        for node in &model.nodes {
            for edge in &node.p_edges {
                for cons in &edge.cons_sets {
                    for opt in &cons.options {
                        if let ConstraintOption::Fn(call) = opt {
                            if !fns.contains_key(&call.fn_id) {
                                return Err(LvsError::UndefinedUserFn(call.fn_id.clone()));
                            }
                        }
                    }
                }
            }
        }
        let symbols = model
            .symbols
            .iter()
            .map(|s| (s.tag, s.ident.clone()))
            .collect();
        Ok(Self {
            model,
            fns,
            symbols,
        })
    }

    pub fn model(&self) -> &LvsModel {
        &self.model
    }

    fn check_cons(
        &self,
        value: &[u8],
        env: &HashMap<u64, Vec<u8>>,
        cons_sets: &[PatternConstraint],
    ) -> bool {
        for cons in cons_sets {
            let mut satisfied = false;
            for opt in &cons.options {
                match opt {
                    ConstraintOption::Value(v) => {
                        if value == v.as_ref() {
                            satisfied = true;
                        }
                    }
                    ConstraintOption::Tag(tag) => {
                        if env.get(tag).is_some_and(|bound| bound == value) {
                            satisfied = true;
                        }
                    }
                    ConstraintOption::Fn(call) => {
                        let args: Vec<Option<&[u8]>> = call
                            .args
                            .iter()
                            .map(|arg| match arg {
                                UserFnArg::Value(v) => Some(v.as_ref()),
                                UserFnArg::Tag(tag) => env.get(tag).map(|b| b.as_slice()),
                            })
                            .collect();
                        // Loading validated every function reference
                        if let Some(f) = self.fns.get(&call.fn_id) {
                            if f(value, &args) {
                                satisfied = true;
                            }
                        }
                    }
                }
                if satisfied {
                    break;
                }
            }
            if !satisfied {
                return false;
            }
        }
        true
    }

    fn walk(
        &self,
        comps: &[&[u8]],
        depth: usize,
        node_id: u64,
        env: &mut HashMap<u64, Vec<u8>>,
        out: &mut Vec<(u64, HashMap<u64, Vec<u8>>)>,
    ) {
        if depth == comps.len() {
            out.push((node_id, env.clone()));
            return;
        }
        let node = &self.model.nodes[node_id as usize];
        let comp = comps[depth];

        for ve in &node.v_edges {
            if comp == ve.value.as_ref() {
                self.walk(comps, depth + 1, ve.dest, env, out);
                break;
            }
        }
        for pe in &node.p_edges {
            match env.get(&pe.tag) {
                Some(bound) => {
                    if bound == comp {
                        self.walk(comps, depth + 1, pe.dest, env, out);
                    }
                }
                None => {
                    if self.check_cons(comp, env, &pe.cons_sets) {
                        env.insert(pe.tag, comp.to_vec());
                        self.walk(comps, depth + 1, pe.dest, env, out);
                        env.remove(&pe.tag);
                    }
                }
            }
        }
    }

    fn match_internal(
        &self,
        name: &Name,
        initial_env: HashMap<u64, Vec<u8>>,
    ) -> Vec<(u64, HashMap<u64, Vec<u8>>)> {
        let comps: Vec<&[u8]> = name.iter().map(|c| c.wire()).collect();
        let mut env = initial_env;
        let mut out = Vec::new();
        self.walk(&comps, 0, self.model.start_id, &mut env, &mut out);
        out
    }

    /// Named-pattern bindings only, mapped back to their identifiers
    fn env_to_symbols(&self, env: &HashMap<u64, Vec<u8>>) -> HashMap<String, Bytes> {
        let mut ret = HashMap::new();
        for (tag, value) in env {
            if *tag <= self.model.named_pattern_cnt {
                if let Some(ident) = self.symbols.get(tag) {
                    ret.insert(ident.clone(), Bytes::from(value.clone()));
                }
            }
        }
        ret
    }

    /// Every (rule names, environment) accepted for a name
    ///
    /// Nodes without rule names report as `#_<node-id>`.
    pub fn match_name(&self, name: &Name) -> Vec<(Vec<String>, HashMap<String, Bytes>)> {
        self.match_internal(name, HashMap::new())
            .into_iter()
            .map(|(node_id, env)| {
                let node = &self.model.nodes[node_id as usize];
                let rule_names = if node.rule_names.is_empty() {
                    vec![format!("#_{node_id}")]
                } else {
                    node.rule_names.clone()
                };
                (rule_names, self.env_to_symbols(&env))
            })
            .collect()
    }

    /// True when some terminal for `pkt_name` accepts a signer terminal
    /// reachable for `key_name` under a consistent environment
    pub fn check(&self, pkt_name: &Name, key_name: &Name) -> bool {
        for (pkt_node_id, env) in self.match_internal(pkt_name, HashMap::new()) {
            let pkt_node = &self.model.nodes[pkt_node_id as usize];
            if pkt_node.sign_cons.is_empty() {
                continue;
            }
            for (key_node_id, _) in self.match_internal(key_name, env.clone()) {
                if pkt_node.sign_cons.contains(&key_node_id) {
                    return true;
                }
            }
        }
        false
    }
}

fn component_type(wire: &[u8]) -> Option<u64> {
    parse_tl_num(wire, 0).ok().map(|(typ, _)| typ)
}

fn component_number(wire: &[u8]) -> Option<u64> {
    let (_, size_typ) = parse_tl_num(wire, 0).ok()?;
    let (_, size_len) = parse_tl_num(wire, size_typ).ok()?;
    Some(parse_uint(&wire[size_typ + size_len..]))
}

fn numeric_fn(op: fn(u64, u64) -> bool) -> UserFn {
    Box::new(move |comp, args| {
        let Some(lhs) = component_number(comp) else {
            return false;
        };
        !args.is_empty()
            && args.iter().all(|arg| {
                arg.and_then(component_number)
                    .map(|rhs| op(lhs, rhs))
                    .unwrap_or(false)
            })
    })
}

/// The default user function set
///
/// `$eq` requires the component to equal every argument; `$eq_type` requires
/// the component's type number to equal every argument's; `$lt`, `$le`,
/// `$gt` and `$ge` compare the component's numeric value against every
/// argument's. Deployments register further functions by name.
pub fn default_user_fns() -> HashMap<String, UserFn> {
    let mut fns: HashMap<String, UserFn> = HashMap::new();
    fns.insert(
        "$eq".into(),
        Box::new(|comp, args| !args.is_empty() && args.iter().all(|arg| *arg == Some(comp))),
    );
    fns.insert(
        "$eq_type".into(),
        Box::new(|comp, args| {
            let Some(typ) = component_type(comp) else {
                return false;
            };
            !args.is_empty()
                && args.iter().all(|arg| {
                    arg.and_then(component_type)
                        .map(|t| t == typ)
                        .unwrap_or(false)
                })
        }),
    );
    fns.insert("$lt".into(), numeric_fn(|a, b| a < b));
    fns.insert("$le".into(), numeric_fn(|a, b| a <= b));
    fns.insert("$gt".into(), numeric_fn(|a, b| a > b));
    fns.insert("$ge".into(), numeric_fn(|a, b| a >= b));
    fns
}
