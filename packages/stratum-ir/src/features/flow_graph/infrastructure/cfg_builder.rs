//! CFG construction
//!
//! Builds per-function control flow graphs from the owned syntax tree:
//! an Entry and Exit block, one block per straight-line segment, branch
//! arm, loop header and try/except/finally clause. Edges are labelled
//! {Unconditional, True, False, Exception, Back}.

use crate::features::parsing::domain::{SyntaxKind, SyntaxNode};
use crate::shared::models::{
    CfgBlock, CfgBlockKind, CfgEdge, CfgEdgeKind, ControlFlowGraph, Span,
};

pub struct CfgBuilder {
    function_node_id: String,
    blocks: Vec<CfgBlock>,
    edges: Vec<CfgEdge>,
    counter: usize,
    exit_id: String,
}

/// Result of building one function's CFG
pub struct FunctionCfg {
    pub graph: ControlFlowGraph,
    pub blocks: Vec<CfgBlock>,
    pub edges: Vec<CfgEdge>,
}

impl CfgBuilder {
    pub fn build(function_node_id: &str, body: &SyntaxNode) -> FunctionCfg {
        let mut builder = Self {
            function_node_id: function_node_id.to_string(),
            blocks: Vec::new(),
            edges: Vec::new(),
            counter: 0,
            exit_id: String::new(),
        };

        let entry_id = builder.new_block(CfgBlockKind::Entry, Some(body.span));
        builder.exit_id = builder.new_block(CfgBlockKind::Exit, None);
        let exit_id = builder.exit_id.clone();

        let first = builder.new_block(CfgBlockKind::Block, Some(body.span));
        builder.edge(&entry_id, &first, CfgEdgeKind::Unconditional);

        let last = builder.process_statements(&body.children, first);
        if let Some(last) = last {
            builder.edge(&last, &exit_id, CfgEdgeKind::Unconditional);
        }

        builder.populate_pred_succ();

        let block_ids = builder.blocks.iter().map(|b| b.id.clone()).collect();
        FunctionCfg {
            graph: ControlFlowGraph {
                function_node_id: function_node_id.to_string(),
                entry_block_id: entry_id,
                exit_block_id: exit_id,
                block_ids,
            },
            blocks: builder.blocks,
            edges: builder.edges,
        }
    }

    fn new_block(&mut self, kind: CfgBlockKind, span: Option<Span>) -> String {
        let id = format!("{}:b{}", self.function_node_id, self.counter);
        self.counter += 1;
        let mut block = CfgBlock::new(id.clone(), kind, self.function_node_id.clone());
        block.span = span;
        self.blocks.push(block);
        id
    }

    fn edge(&mut self, from: &str, to: &str, kind: CfgEdgeKind) {
        self.edges.push(CfgEdge::new(from, to, kind));
    }

    fn append_statement(&mut self, block_id: &str, node: &SyntaxNode) {
        let statement = node.text.lines().next().unwrap_or("").trim().to_string();
        if statement.is_empty() {
            return;
        }
        let (defined, used) = names_in_statement(node);
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == block_id) {
            block.statements.push(statement);
            for name in defined {
                if !block.defined_vars.contains(&name) {
                    block.defined_vars.push(name);
                }
            }
            for name in used {
                if !block.used_vars.contains(&name) {
                    block.used_vars.push(name);
                }
            }
            if block.span.is_none() {
                block.span = Some(node.span);
            }
        }
    }

    /// Process a statement list starting in `current`. Returns the block
    /// control flows out of, or None if every path terminated.
    fn process_statements(
        &mut self,
        statements: &[SyntaxNode],
        mut current: String,
    ) -> Option<String> {
        for statement in statements {
            match &statement.kind {
                SyntaxKind::IfStmt => {
                    current = match self.process_if(statement, &current) {
                        Some(join) => join,
                        None => return None,
                    };
                }
                SyntaxKind::ForStmt | SyntaxKind::WhileStmt => {
                    current = self.process_loop(statement, &current);
                }
                SyntaxKind::TryStmt => {
                    current = self.process_try(statement, &current);
                }
                SyntaxKind::ReturnStmt | SyntaxKind::RaiseStmt => {
                    self.append_statement(&current, statement);
                    let exit_id = self.exit_id.clone();
                    let kind = if statement.kind == SyntaxKind::RaiseStmt {
                        CfgEdgeKind::Exception
                    } else {
                        CfgEdgeKind::Unconditional
                    };
                    self.edge(&current, &exit_id, kind);
                    return None;
                }
                SyntaxKind::Comment => {}
                _ => {
                    self.append_statement(&current, statement);
                }
            }
        }
        Some(current)
    }

    /// if / elif / else chain. Returns the join block when any arm falls
    /// through.
    fn process_if(&mut self, node: &SyntaxNode, current: &str) -> Option<String> {
        let if_block = self.new_block(CfgBlockKind::If, Some(node.span));
        if let Some(condition) = node.child_by_field("condition") {
            self.append_statement(&if_block, condition);
        }
        self.edge(current, &if_block, CfgEdgeKind::Unconditional);

        let join = self.new_block(CfgBlockKind::Block, None);
        let mut any_falls_through = false;

        // Then arm
        if let Some(consequence) = node.child_by_field("consequence") {
            let then_block = self.new_block(CfgBlockKind::Block, Some(consequence.span));
            self.edge(&if_block, &then_block, CfgEdgeKind::True);
            if let Some(end) = self.process_statements(&consequence.children, then_block) {
                self.edge(&end, &join, CfgEdgeKind::Unconditional);
                any_falls_through = true;
            }
        } else {
            self.edge(&if_block, &join, CfgEdgeKind::True);
            any_falls_through = true;
        }

        // elif/else clauses are siblings under the if statement; chain them
        // in order so each elif hangs off the previous condition's false edge
        let alternatives: Vec<&SyntaxNode> = node
            .children
            .iter()
            .filter(|c| matches!(c.kind, SyntaxKind::ElifClause | SyntaxKind::ElseClause))
            .collect();
        self.process_alternatives(&alternatives, &if_block, &join, &mut any_falls_through);

        if any_falls_through {
            Some(join)
        } else {
            // Join block is unreachable; drop it
            self.blocks.retain(|b| b.id != join);
            None
        }
    }

    fn process_alternatives(
        &mut self,
        alternatives: &[&SyntaxNode],
        branch_block: &str,
        join: &str,
        any_falls_through: &mut bool,
    ) {
        match alternatives.split_first() {
            None => {
                self.edge(branch_block, join, CfgEdgeKind::False);
                *any_falls_through = true;
            }
            Some((clause, rest)) if clause.kind == SyntaxKind::ElifClause => {
                let elif_block = self.new_block(CfgBlockKind::If, Some(clause.span));
                if let Some(condition) = clause.child_by_field("condition") {
                    self.append_statement(&elif_block, condition);
                }
                self.edge(branch_block, &elif_block, CfgEdgeKind::False);

                if let Some(consequence) = clause.child_by_field("consequence") {
                    let then_block = self.new_block(CfgBlockKind::Block, Some(consequence.span));
                    self.edge(&elif_block, &then_block, CfgEdgeKind::True);
                    if let Some(end) = self.process_statements(&consequence.children, then_block) {
                        self.edge(&end, join, CfgEdgeKind::Unconditional);
                        *any_falls_through = true;
                    }
                } else {
                    self.edge(&elif_block, join, CfgEdgeKind::True);
                    *any_falls_through = true;
                }
                self.process_alternatives(rest, &elif_block, join, any_falls_through);
            }
            Some((clause, _)) => {
                let else_block = self.new_block(CfgBlockKind::Else, Some(clause.span));
                self.edge(branch_block, &else_block, CfgEdgeKind::False);
                let body: Vec<SyntaxNode> = clause
                    .children
                    .iter()
                    .filter(|c| c.kind == SyntaxKind::Block)
                    .flat_map(|b| b.children.clone())
                    .collect();
                if let Some(end) = self.process_statements(&body, else_block) {
                    self.edge(&end, join, CfgEdgeKind::Unconditional);
                    *any_falls_through = true;
                }
            }
        }
    }

    fn process_loop(&mut self, node: &SyntaxNode, current: &str) -> String {
        let header = self.new_block(CfgBlockKind::LoopHeader, Some(node.span));
        // Header carries the loop control statement (bound extraction input)
        let first_line = node.text.lines().next().unwrap_or("").trim().to_string();
        let (defined, used) = loop_header_names(node);
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == header) {
            block.statements.push(first_line);
            block.defined_vars = defined;
            block.used_vars = used;
        }

        self.edge(current, &header, CfgEdgeKind::Unconditional);

        let after = self.new_block(CfgBlockKind::Block, None);
        if let Some(body) = node.child_by_field("body") {
            let body_block = self.new_block(CfgBlockKind::Block, Some(body.span));
            self.edge(&header, &body_block, CfgEdgeKind::True);
            if let Some(end) = self.process_statements(&body.children, body_block) {
                self.edge(&end, &header, CfgEdgeKind::Back);
            }
        }
        self.edge(&header, &after, CfgEdgeKind::False);
        after
    }

    fn process_try(&mut self, node: &SyntaxNode, current: &str) -> String {
        let try_block = self.new_block(CfgBlockKind::Try, Some(node.span));
        self.edge(current, &try_block, CfgEdgeKind::Unconditional);

        let after = self.new_block(CfgBlockKind::Block, None);

        let try_end = match node.child_by_field("body") {
            Some(body) => self.process_statements(&body.children, try_block.clone()),
            None => Some(try_block.clone()),
        };

        let mut except_ends: Vec<String> = Vec::new();
        for clause in node.find_children(&SyntaxKind::ExceptClause) {
            let except_block = self.new_block(CfgBlockKind::Except, Some(clause.span));
            self.edge(&try_block, &except_block, CfgEdgeKind::Exception);
            let body: Vec<SyntaxNode> = clause
                .children
                .iter()
                .filter(|c| c.kind == SyntaxKind::Block)
                .flat_map(|b| b.children.clone())
                .collect();
            if let Some(end) = self.process_statements(&body, except_block) {
                except_ends.push(end);
            }
        }

        // Finally runs on both paths
        if let Some(finally) = node.find_child(&SyntaxKind::FinallyClause) {
            let finally_block = self.new_block(CfgBlockKind::Finally, Some(finally.span));
            if let Some(end) = &try_end {
                self.edge(end, &finally_block, CfgEdgeKind::Unconditional);
            }
            for end in &except_ends {
                self.edge(end, &finally_block, CfgEdgeKind::Unconditional);
            }
            let body: Vec<SyntaxNode> = finally
                .children
                .iter()
                .filter(|c| c.kind == SyntaxKind::Block)
                .flat_map(|b| b.children.clone())
                .collect();
            if let Some(end) = self.process_statements(&body, finally_block) {
                self.edge(&end, &after, CfgEdgeKind::Unconditional);
            }
        } else {
            if let Some(end) = &try_end {
                self.edge(end, &after, CfgEdgeKind::Unconditional);
            }
            for end in &except_ends {
                self.edge(end, &after, CfgEdgeKind::Unconditional);
            }
        }

        after
    }

    fn populate_pred_succ(&mut self) {
        for i in 0..self.blocks.len() {
            let id = self.blocks[i].id.clone();
            let successors: Vec<String> = self
                .edges
                .iter()
                .filter(|e| e.source_block_id == id)
                .map(|e| e.target_block_id.clone())
                .collect();
            let predecessors: Vec<String> = self
                .edges
                .iter()
                .filter(|e| e.target_block_id == id)
                .map(|e| e.source_block_id.clone())
                .collect();
            self.blocks[i].successors = successors;
            self.blocks[i].predecessors = predecessors;
        }
    }
}

/// Defined/used names of a simple statement
fn names_in_statement(node: &SyntaxNode) -> (Vec<String>, Vec<String>) {
    let mut defined = Vec::new();
    let mut used = Vec::new();

    let assignment = if node.raw_kind == "expression_statement" {
        node.children
            .iter()
            .find(|c| c.kind == SyntaxKind::AssignmentStmt)
    } else if node.kind == SyntaxKind::AssignmentStmt {
        Some(node)
    } else {
        None
    };

    if let Some(assignment) = assignment {
        if let Some(left) = assignment.child_by_field("left") {
            if left.kind == SyntaxKind::NameExpr {
                defined.push(left.text.trim().to_string());
            }
        }
        if let Some(right) = assignment.child_by_field("right") {
            collect_identifiers(right, &mut used);
        }
    } else {
        collect_identifiers(node, &mut used);
    }

    used.retain(|name| !defined.contains(name));
    used.dedup();
    (defined, used)
}

/// For-loop targets are defined; iterables and while conditions are used
fn loop_header_names(node: &SyntaxNode) -> (Vec<String>, Vec<String>) {
    let mut defined = Vec::new();
    let mut used = Vec::new();
    if node.kind == SyntaxKind::ForStmt {
        if let Some(left) = node.child_by_field("left") {
            collect_identifiers(left, &mut defined);
        }
        if let Some(right) = node.child_by_field("right") {
            collect_identifiers(right, &mut used);
        }
    } else if let Some(condition) = node.child_by_field("condition") {
        collect_identifiers(condition, &mut used);
    }
    (defined, used)
}

fn collect_identifiers(node: &SyntaxNode, out: &mut Vec<String>) {
    node.walk(&mut |n| {
        if n.kind == SyntaxKind::NameExpr && !out.contains(&n.text) {
            out.push(n.text.clone());
        }
    });
}
