//! # Schema Compiler
//!
//! ## Purpose
//!
//! Turns parsed schema text into the binary automaton model. Phases:
//!
//! 1. Rule numbering: anonymous rules (`#_...`) get unique suffixes;
//!    redefining a named rule is an error.
//! 2. Reference graph: rule references from names and signing constraints
//!    must exist, must not be anonymous, and must form a DAG; rules are
//!    processed in topological order, dependencies first.
//! 3. Pattern numbering: named patterns get stable small tags shared across
//!    rules in first-seen order; temporary patterns get fresh negative
//!    placeholders, one per occurrence.
//! 4. Rule expansion: embedded rule references are substituted with every
//!    chain of the referenced rule (cartesian product across references).
//! 5. Automaton construction: depth-first partitioning of chains by head
//!    component. Literals become value edges grouped by bytes; patterns
//!    become pattern edges grouped by a canonical textual encoding of
//!    (tag, constraints). Temporary tags are renumbered into the range
//!    above the named-pattern count; the renumbering map travels with the
//!    construction path so back-references stay intact.
//! 6. Signing resolution: accepted-signer rule names become the terminal
//!    node ids of those rules.
//!
//! Every iteration order is sorted, so compiling the same text twice yields
//! byte-identical models.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use bytes::Bytes;

use crate::ast::{ConsOption, FnArg, LvsFile, NameUnit, Rule};
use crate::error::{LvsError, LvsResult};
use crate::grammar::parse_lvs;
use crate::model::{
    ConstraintOption, LvsModel, Node, PatternConstraint, PatternEdge, TagSymbol, UserFnArg,
    UserFnCall, ValueEdge, VERSION,
};

/// Sort identifiers of a DAG into topological order, dependencies first
///
/// `graph` is an adjacency list from a rule to the rules it references.
pub fn top_order(
    nodes: &BTreeSet<String>,
    graph: &BTreeMap<String, Vec<String>>,
) -> LvsResult<Vec<String>> {
    let mut in_degs: BTreeMap<&str, i64> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    for (src, edges) in graph {
        for dst in edges {
            if !nodes.contains(src) || !nodes.contains(dst) {
                return Err(LvsError::DanglingReference {
                    rule: src.clone(),
                    target: dst.clone(),
                });
            }
            *in_degs.get_mut(dst.as_str()).expect("dst checked") += 1;
        }
    }
    let mut ret: Vec<String> = Vec::new();
    while ret.len() < nodes.len() {
        let cur_round: Vec<&str> = in_degs
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        if cur_round.is_empty() {
            let remaining: Vec<&str> = in_degs
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(n, _)| *n)
                .collect();
            return Err(LvsError::CyclicReference(remaining.join(", ")));
        }
        for n in cur_round {
            for n2 in &graph[n] {
                *in_degs.get_mut(n2.as_str()).expect("graph checked") -= 1;
            }
            *in_degs.get_mut(n).expect("node known") = -1;
            ret.push(n.to_string());
        }
    }
    ret.reverse();
    Ok(ret)
}

fn is_temp_rule(id: &str) -> bool {
    id.as_bytes().get(1) == Some(&b'_')
}

fn is_temp_pattern(id: &str) -> bool {
    id.starts_with('_')
}

/// Numbered name element after phase 3
#[derive(Debug, Clone)]
enum NumUnit {
    Value(Vec<u8>),
    Pattern(i64),
    RuleRef(String),
}

#[derive(Debug, Clone)]
enum NumFnArg {
    Value(Vec<u8>),
    Tag(i64),
}

#[derive(Debug, Clone)]
enum NumOption {
    Value(Vec<u8>),
    Tag(i64),
    Fn { name: String, args: Vec<NumFnArg> },
}

/// One constraint after numbering; applies to every listed occurrence
#[derive(Debug, Clone)]
struct NumConstraint {
    tags: Vec<i64>,
    options: Vec<NumOption>,
}

#[derive(Debug, Clone)]
struct NumRule {
    id: String,
    name: Vec<NumUnit>,
    comp_cons: Vec<Vec<NumConstraint>>,
    sign_cons: Vec<String>,
}

/// A fully expanded rule chain: flat component sequence plus constraints
#[derive(Debug, Clone)]
struct RuleChain {
    id: String,
    name: Vec<ChainUnit>,
    cons_set: Vec<NumConstraint>,
    sign_cons: Vec<String>,
}

#[derive(Debug, Clone)]
enum ChainUnit {
    Value(Vec<u8>),
    Pattern(i64),
}

struct Compiler {
    rules: Vec<Rule>,
    /// Named pattern tags in first-seen order, 1-based
    named_pats: HashMap<String, i64>,
    named_order: Vec<String>,
    rep_rules: BTreeMap<String, Vec<RuleChain>>,
    node_pool: Vec<Node>,
    pending_sign: Vec<Vec<String>>,
    rule_node_ids: HashMap<String, Vec<u64>>,
    temp_tag_index: u64,
}

impl Compiler {
    fn new(file: LvsFile) -> Self {
        Self {
            rules: file.rules,
            named_pats: HashMap::new(),
            named_order: Vec::new(),
            rep_rules: BTreeMap::new(),
            node_pool: Vec::new(),
            pending_sign: Vec::new(),
            rule_node_ids: HashMap::new(),
            temp_tag_index: 0,
        }
    }

    /// Phases 1 and 2: disambiguate anonymous rules, build the reference
    /// graph, and sort rules in dependency order
    fn sort_rule_references(&mut self) -> LvsResult<()> {
        let mut rule_id_set: BTreeSet<String> = BTreeSet::new();
        let mut temp_rule_number = 1;
        for rule in &mut self.rules {
            if is_temp_rule(&rule.id) {
                rule.id = format!("{}#{}", rule.id, temp_rule_number);
                temp_rule_number += 1;
            } else if rule_id_set.contains(&rule.id) {
                return Err(LvsError::Redefinition(rule.id.clone()));
            }
            rule_id_set.insert(rule.id.clone());
        }

        let mut adj_lst: BTreeMap<String, Vec<String>> = rule_id_set
            .iter()
            .map(|r| (r.clone(), Vec::new()))
            .collect();
        for rule in &self.rules {
            let name_refs = rule.name.iter().filter_map(|unit| match unit {
                NameUnit::RuleRef(target) => Some(target),
                _ => None,
            });
            for target in name_refs.chain(rule.sign_cons.iter()) {
                if is_temp_rule(target) {
                    return Err(LvsError::TemporaryReference {
                        rule: rule.id.clone(),
                        target: target.clone(),
                    });
                }
                if !rule_id_set.contains(target) {
                    return Err(LvsError::DanglingReference {
                        rule: rule.id.clone(),
                        target: target.clone(),
                    });
                }
                adj_lst
                    .get_mut(&rule.id)
                    .expect("own rule present")
                    .push(target.clone());
            }
        }

        let order = top_order(&rule_id_set, &adj_lst)?;
        let idx_lookup: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, r)| (r.as_str(), i))
            .collect();
        self.rules.sort_by_key(|r| idx_lookup[r.id.as_str()]);
        Ok(())
    }

    /// Phase 3: assign numeric tags to patterns and rewrite constraints
    fn gen_pattern_numbers(&mut self) -> LvsResult<Vec<NumRule>> {
        let mut next_named: i64 = 1;
        let mut next_temp: i64 = -1;
        let mut ret = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let mut temp_pats: HashMap<&str, Vec<i64>> = HashMap::new();
            let mut name = Vec::with_capacity(rule.name.len());
            for unit in &rule.name {
                match unit {
                    NameUnit::Value(v) => name.push(NumUnit::Value(v.clone())),
                    NameUnit::RuleRef(r) => name.push(NumUnit::RuleRef(r.clone())),
                    NameUnit::Pattern(p) if is_temp_pattern(p) => {
                        let tag = next_temp;
                        next_temp -= 1;
                        temp_pats.entry(p.as_str()).or_default().push(tag);
                        name.push(NumUnit::Pattern(tag));
                    }
                    NameUnit::Pattern(p) => {
                        let tag = match self.named_pats.get(p.as_str()) {
                            Some(tag) => *tag,
                            None => {
                                let tag = next_named;
                                next_named += 1;
                                self.named_pats.insert(p.clone(), tag);
                                self.named_order.push(p.clone());
                                tag
                            }
                        };
                        name.push(NumUnit::Pattern(tag));
                    }
                }
            }

            let number_option = |opt: &ConsOption| -> LvsResult<NumOption> {
                match opt {
                    ConsOption::Value(v) => Ok(NumOption::Value(v.clone())),
                    ConsOption::Pattern(p) => {
                        if is_temp_pattern(p) {
                            return Err(LvsError::TemporaryInOption(p.clone()));
                        }
                        let tag = self
                            .named_pats
                            .get(p.as_str())
                            .ok_or_else(|| LvsError::UnboundPattern(p.clone()))?;
                        Ok(NumOption::Tag(*tag))
                    }
                    ConsOption::Fn { name, args } => {
                        let args = args
                            .iter()
                            .map(|arg| match arg {
                                FnArg::Value(v) => Ok(NumFnArg::Value(v.clone())),
                                FnArg::Pattern(p) => {
                                    if is_temp_pattern(p) {
                                        return Err(LvsError::TemporaryInOption(p.clone()));
                                    }
                                    self.named_pats
                                        .get(p.as_str())
                                        .map(|t| NumFnArg::Tag(*t))
                                        .ok_or_else(|| LvsError::UnboundPattern(p.clone()))
                                }
                            })
                            .collect::<LvsResult<Vec<_>>>()?;
                        Ok(NumOption::Fn {
                            name: name.clone(),
                            args,
                        })
                    }
                }
            };

            let mut comp_cons = Vec::with_capacity(rule.comp_cons.len());
            for cons_set in &rule.comp_cons {
                let mut numbered_set = Vec::with_capacity(cons_set.len());
                for cons in cons_set {
                    let tags = if is_temp_pattern(&cons.pattern) {
                        temp_pats
                            .get(cons.pattern.as_str())
                            .cloned()
                            .ok_or_else(|| LvsError::UnboundPattern(cons.pattern.clone()))?
                    } else {
                        vec![*self
                            .named_pats
                            .get(cons.pattern.as_str())
                            .ok_or_else(|| LvsError::UnboundPattern(cons.pattern.clone()))?]
                    };
                    let options = cons
                        .options
                        .iter()
                        .map(number_option)
                        .collect::<LvsResult<Vec<_>>>()?;
                    numbered_set.push(NumConstraint { tags, options });
                }
                comp_cons.push(numbered_set);
            }

            ret.push(NumRule {
                id: rule.id.clone(),
                name,
                comp_cons,
                sign_cons: {
                    let mut sign = rule.sign_cons.clone();
                    sign.sort();
                    sign
                },
            });
        }
        Ok(ret)
    }

    /// Phase 4: expand embedded rule references into flat chains
    fn replicate_rules(&mut self, rules: Vec<NumRule>) {
        for rule in rules {
            let mut cur_chains: Vec<RuleChain> = if rule.comp_cons.is_empty() {
                vec![RuleChain {
                    id: rule.id.clone(),
                    name: Vec::new(),
                    cons_set: Vec::new(),
                    sign_cons: rule.sign_cons.clone(),
                }]
            } else {
                rule.comp_cons
                    .iter()
                    .map(|cons| RuleChain {
                        id: rule.id.clone(),
                        name: Vec::new(),
                        cons_set: cons.clone(),
                        sign_cons: rule.sign_cons.clone(),
                    })
                    .collect()
            };
            for unit in &rule.name {
                match unit {
                    NumUnit::Value(v) => {
                        for chain in &mut cur_chains {
                            chain.name.push(ChainUnit::Value(v.clone()));
                        }
                    }
                    NumUnit::Pattern(tag) => {
                        for chain in &mut cur_chains {
                            chain.name.push(ChainUnit::Pattern(*tag));
                        }
                    }
                    NumUnit::RuleRef(target) => {
                        let ref_chains = &self.rep_rules[target];
                        let mut new_chains =
                            Vec::with_capacity(ref_chains.len() * cur_chains.len());
                        for ref_chain in ref_chains {
                            for chain in &cur_chains {
                                let mut name = chain.name.clone();
                                name.extend(ref_chain.name.iter().cloned());
                                let mut cons_set = chain.cons_set.clone();
                                cons_set.extend(ref_chain.cons_set.iter().cloned());
                                new_chains.push(RuleChain {
                                    id: chain.id.clone(),
                                    name,
                                    cons_set,
                                    sign_cons: chain.sign_cons.clone(),
                                });
                            }
                        }
                        cur_chains = new_chains;
                    }
                }
            }
            self.rep_rules
                .entry(rule.id.clone())
                .or_default()
                .extend(cur_chains);
        }
    }

    /// Canonical encoding of one chain's movement at a depth, used to group
    /// chains into shared pattern edges
    fn pattern_movement(
        chain: &RuleChain,
        depth: usize,
        prev_tags: &HashSet<i64>,
    ) -> Option<(i64, Vec<PatternConstraint>, String)> {
        let tag = match chain.name[depth] {
            ChainUnit::Pattern(tag) => tag,
            ChainUnit::Value(_) => return None,
        };
        if prev_tags.contains(&tag) {
            return Some((tag, Vec::new(), format!("{tag}:")));
        }
        let mut cons_sets = Vec::new();
        let mut key = format!("{tag}:");
        for cons in &chain.cons_set {
            if !cons.tags.contains(&tag) {
                continue;
            }
            let mut encoded = PatternConstraint::default();
            key.push('{');
            for opt in &cons.options {
                match opt {
                    NumOption::Value(v) => {
                        encoded.options.push(ConstraintOption::Value(Bytes::from(v.clone())));
                        key.push_str("v=");
                        key.push_str(&hex::encode(v));
                    }
                    NumOption::Tag(t) => {
                        encoded.options.push(ConstraintOption::Tag(*t as u64));
                        key.push_str(&format!("t={t}"));
                    }
                    NumOption::Fn { name, args } => {
                        let mut call = UserFnCall {
                            fn_id: name.clone(),
                            args: Vec::with_capacity(args.len()),
                        };
                        key.push_str(name);
                        key.push('(');
                        for arg in args {
                            match arg {
                                NumFnArg::Value(v) => {
                                    call.args.push(UserFnArg::Value(Bytes::from(v.clone())));
                                    key.push_str("v=");
                                    key.push_str(&hex::encode(v));
                                }
                                NumFnArg::Tag(t) => {
                                    call.args.push(UserFnArg::Tag(*t as u64));
                                    key.push_str(&format!("t={t}"));
                                }
                            }
                        }
                        key.push(')');
                        encoded.options.push(ConstraintOption::Fn(call));
                    }
                }
                key.push(',');
            }
            key.push('}');
            cons_sets.push(encoded);
        }
        Some((tag, cons_sets, key))
    }

    /// Phase 5: depth-first automaton construction
    fn generate_node(
        &mut self,
        depth: usize,
        context: Vec<&RuleChain>,
        parent: Option<u64>,
        prev_tags: &HashSet<i64>,
        tag_map: &HashMap<i64, u64>,
    ) -> u64 {
        let id = self.node_pool.len() as u64;
        self.node_pool.push(Node {
            id,
            parent,
            ..Default::default()
        });
        self.pending_sign.push(Vec::new());

        // Chains ending here contribute rule names and signing constraints
        let mut continuing: Vec<&RuleChain> = Vec::new();
        for chain in context {
            if depth == chain.name.len() {
                let node = &mut self.node_pool[id as usize];
                if !node.rule_names.contains(&chain.id) {
                    node.rule_names.push(chain.id.clone());
                }
                self.pending_sign[id as usize].extend(chain.sign_cons.iter().cloned());
                self.rule_node_ids.entry(chain.id.clone()).or_default().push(id);
            } else {
                continuing.push(chain);
            }
        }

        // Value movements, grouped by exact component bytes
        let v_move: BTreeSet<Vec<u8>> = continuing
            .iter()
            .filter_map(|chain| match &chain.name[depth] {
                ChainUnit::Value(v) => Some(v.clone()),
                ChainUnit::Pattern(_) => None,
            })
            .collect();
        for v in v_move {
            let new_context: Vec<&RuleChain> = continuing
                .iter()
                .filter(|chain| matches!(&chain.name[depth], ChainUnit::Value(cv) if *cv == v))
                .copied()
                .collect();
            let dest = self.generate_node(depth + 1, new_context, Some(id), prev_tags, tag_map);
            self.node_pool[id as usize].v_edges.push(ValueEdge {
                dest,
                value: Bytes::from(v),
            });
        }

        // Pattern movements, grouped by canonical (tag, constraints) encoding
        let p_moves: Vec<(i64, Vec<PatternConstraint>, String, &RuleChain)> = continuing
            .iter()
            .filter_map(|chain| {
                Self::pattern_movement(chain, depth, prev_tags)
                    .map(|(tag, cons, key)| (tag, cons, key, *chain))
            })
            .collect();
        let move_keys: BTreeSet<&String> = p_moves.iter().map(|(_, _, key, _)| key).collect();
        for key in move_keys {
            let group: Vec<&(i64, Vec<PatternConstraint>, String, &RuleChain)> =
                p_moves.iter().filter(|(_, _, k, _)| k == key).collect();
            let &(tag, ref cons_sets, _, _) = group[0];
            let emitted_tag = if tag >= 0 {
                tag as u64
            } else if let Some(mapped) = tag_map.get(&tag) {
                *mapped
            } else {
                self.temp_tag_index += 1;
                self.temp_tag_index
            };
            let new_context: Vec<&RuleChain> = group.iter().map(|(_, _, _, chain)| *chain).collect();
            let cons_sets = cons_sets.clone();
            let mut next_prev = prev_tags.clone();
            next_prev.insert(tag);
            let mut next_map = tag_map.clone();
            next_map.insert(tag, emitted_tag);
            let dest = self.generate_node(depth + 1, new_context, Some(id), &next_prev, &next_map);
            self.node_pool[id as usize].p_edges.push(PatternEdge {
                dest,
                tag: emitted_tag,
                cons_sets,
            });
        }

        id
    }

    /// Phase 6: rewrite signing rule names into terminal node ids
    fn fix_signing_references(&mut self) -> LvsResult<()> {
        for (idx, names) in self.pending_sign.iter().enumerate() {
            if names.is_empty() {
                continue;
            }
            let mut resolved = Vec::new();
            for rid in names {
                let ids = self
                    .rule_node_ids
                    .get(rid)
                    .ok_or_else(|| LvsError::MissingKeyRule(rid.clone()))?;
                resolved.extend_from_slice(ids);
            }
            resolved.sort_unstable();
            resolved.dedup();
            self.node_pool[idx].sign_cons = resolved;
        }
        Ok(())
    }

    fn compile(mut self) -> LvsResult<LvsModel> {
        self.sort_rule_references()?;
        let numbered = self.gen_pattern_numbers()?;
        self.replicate_rules(numbered);

        let rep_rules = std::mem::take(&mut self.rep_rules);
        let chains: Vec<&RuleChain> = rep_rules.values().flatten().collect();
        self.temp_tag_index = self.named_pats.len() as u64;
        let start_id =
            self.generate_node(0, chains, None, &HashSet::new(), &HashMap::new());
        self.fix_signing_references()?;

        let mut symbols: Vec<TagSymbol> = self
            .named_order
            .iter()
            .map(|ident| TagSymbol {
                tag: self.named_pats[ident.as_str()] as u64,
                ident: ident.clone(),
            })
            .collect();
        symbols.sort_by_key(|sym| sym.tag);

        Ok(LvsModel {
            version: VERSION,
            start_id,
            named_pattern_cnt: self.named_pats.len() as u64,
            nodes: self.node_pool,
            symbols,
        })
    }
}

/// Compile textual Light VerSec into a binary schema model
pub fn compile_lvs(text: &str) -> LvsResult<LvsModel> {
    let file = parse_lvs(text)?;
    Compiler::new(file).compile()
}
