//! Compiled form of a definition's step lists.
//!
//! Step lists are flat, with loops and selections delimited by start/end steps. Compilation checks that those pairs are
//! balanced and records, for every step that can change control flow, the index it transfers control to. The interpreter
//! therefore never has to scan the list to rediscover the nesting.

use crate::error::InvalidDefinitionKind;
use crate::index;
use bytescope::definition::{ExecStep, FieldStep, LoopStep, MatchStep, PrintStep, Step};
use bytescope::Id;

/// Represents a validated step.
#[derive(Clone, Debug)]
pub enum Instruction {
    Field {
        field: index::Field,
        step: FieldStep,
    },
    Match {
        step: MatchStep,
        /// `true` if the match is directly inside a selection, making it one of the selection's alternatives.
        alternative: bool,
        /// Index of the instruction to continue at when the match fails, or when the selection has already been claimed.
        on_failure: usize,
    },
    LoopStart {
        step: LoopStep,
        end: usize,
    },
    LoopEnd {
        start: usize,
    },
    SelectionStart {
        end: usize,
    },
    SelectionEnd {
        start: usize,
    },
    Print(PrintStep),
    Exec(ExecStep),
    Block(index::Block),
}

/// A validated list of steps.
#[derive(Clone, Debug, Default)]
pub struct Code {
    instructions: Box<[Instruction]>,
}

impl Code {
    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterates over the blocks called directly by this code, along with the number of loops and selections that are open
    /// at each call.
    pub(crate) fn block_calls(&self) -> impl Iterator<Item = (index::Block, Nesting)> + '_ {
        let mut nesting = Nesting::default();
        self.instructions.iter().filter_map(move |instruction| {
            match instruction {
                Instruction::LoopStart { .. } => nesting.loops += 1,
                Instruction::LoopEnd { .. } => nesting.loops -= 1,
                Instruction::SelectionStart { .. } => nesting.selections += 1,
                Instruction::SelectionEnd { .. } => nesting.selections -= 1,
                Instruction::Block(block) => return Some((*block, nesting)),
                _ => (),
            }
            None
        })
    }

    /// The deepest nesting of loops and selections within this code alone.
    pub(crate) fn own_nesting(&self) -> Nesting {
        let mut current = Nesting::default();
        let mut maximum = Nesting::default();
        for instruction in self.instructions.iter() {
            match instruction {
                Instruction::LoopStart { .. } => current.loops += 1,
                Instruction::LoopEnd { .. } => current.loops -= 1,
                Instruction::SelectionStart { .. } => current.selections += 1,
                Instruction::SelectionEnd { .. } => current.selections -= 1,
                _ => (),
            }
            maximum = maximum.max(current);
        }
        maximum
    }
}

/// Counts of nested scopes, used to size the stacks of the interpreter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Nesting {
    pub loops: usize,
    pub selections: usize,
    pub blocks: usize,
}

impl Nesting {
    pub fn max(self, other: Self) -> Self {
        Self {
            loops: self.loops.max(other.loops),
            selections: self.selections.max(other.selections),
            blocks: self.blocks.max(other.blocks),
        }
    }

    pub fn add(self, other: Self) -> Self {
        Self {
            loops: self.loops + other.loops,
            selections: self.selections + other.selections,
            blocks: self.blocks + other.blocks,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ScopeKind {
    Loop,
    Selection,
}

struct OpenScope {
    kind: ScopeKind,
    start: usize,
    /// Guards and alternatives waiting to learn the index they jump to on failure.
    pending: Vec<usize>,
}

/// Compiles a list of steps, using the lookup functions to resolve field and block names.
///
/// On failure, returns the index of the offending step along with the reason.
pub(crate) fn compile<F, B>(
    steps: &[Step],
    mut lookup_field: F,
    mut lookup_block: B,
) -> Result<Code, (usize, InvalidDefinitionKind)>
where
    F: FnMut(&Id) -> Option<index::Field>,
    B: FnMut(&Id) -> Option<index::Block>,
{
    let mut instructions = Vec::with_capacity(steps.len());
    let mut scopes: Vec<OpenScope> = Vec::new();
    let mut top_level_guards = Vec::new();

    fn resolve_pending(instructions: &mut [Instruction], pending: &[usize], target: usize) {
        for &index in pending {
            if let Instruction::Match { on_failure, .. } = &mut instructions[index] {
                *on_failure = target;
            }
        }
    }

    for (index, step) in steps.iter().enumerate() {
        let instruction = match step {
            Step::Field(field_step) => Instruction::Field {
                field: lookup_field(&field_step.field)
                    .ok_or_else(|| (index, InvalidDefinitionKind::UnknownField(field_step.field.clone())))?,
                step: field_step.clone(),
            },
            Step::Match(match_step) => {
                if match_step.condition.requires_operand() && match_step.operand.is_none() {
                    return Err((index, InvalidDefinitionKind::MissingOperand(match_step.condition)));
                }

                let alternative = match scopes.last_mut() {
                    Some(scope) if scope.kind == ScopeKind::Selection => {
                        // The previous alternative ends where this one begins.
                        let previous = std::mem::take(&mut scope.pending);
                        resolve_pending(&mut instructions, &previous, index);
                        scope.pending.push(index);
                        true
                    }
                    Some(scope) => {
                        scope.pending.push(index);
                        false
                    }
                    None => {
                        top_level_guards.push(index);
                        false
                    }
                };

                Instruction::Match {
                    step: match_step.clone(),
                    alternative,
                    on_failure: usize::MAX,
                }
            }
            Step::LoopStart(loop_step) => {
                scopes.push(OpenScope {
                    kind: ScopeKind::Loop,
                    start: index,
                    pending: Vec::new(),
                });
                Instruction::LoopStart {
                    step: loop_step.clone(),
                    end: usize::MAX,
                }
            }
            Step::SelectionStart => {
                scopes.push(OpenScope {
                    kind: ScopeKind::Selection,
                    start: index,
                    pending: Vec::new(),
                });
                Instruction::SelectionStart { end: usize::MAX }
            }
            Step::LoopEnd | Step::SelectionEnd => {
                let expected = if matches!(step, Step::LoopEnd) {
                    ScopeKind::Loop
                } else {
                    ScopeKind::Selection
                };

                let scope = match scopes.pop() {
                    Some(scope) if scope.kind == expected => scope,
                    Some(scope) if scope.kind == ScopeKind::Loop => return Err((index, InvalidDefinitionKind::UnbalancedLoop)),
                    Some(_) => return Err((index, InvalidDefinitionKind::UnbalancedSelection)),
                    None => return Err((index, InvalidDefinitionKind::UnexpectedEnd(step.kind_name()))),
                };

                resolve_pending(&mut instructions, &scope.pending, index);
                match &mut instructions[scope.start] {
                    Instruction::LoopStart { end, .. } | Instruction::SelectionStart { end } => *end = index,
                    _ => unreachable!("scope must begin with a start instruction"),
                }

                match expected {
                    ScopeKind::Loop => Instruction::LoopEnd { start: scope.start },
                    ScopeKind::Selection => Instruction::SelectionEnd { start: scope.start },
                }
            }
            Step::Print(print_step) => Instruction::Print(print_step.clone()),
            Step::Exec(exec_step) => Instruction::Exec(exec_step.clone()),
            Step::Block(block_step) => Instruction::Block(
                lookup_block(&block_step.block)
                    .ok_or_else(|| (index, InvalidDefinitionKind::UnknownBlock(block_step.block.clone())))?,
            ),
        };

        instructions.push(instruction);
    }

    if let Some(scope) = scopes.last() {
        return Err((
            scope.start,
            match scope.kind {
                ScopeKind::Loop => InvalidDefinitionKind::UnbalancedLoop,
                ScopeKind::Selection => InvalidDefinitionKind::UnbalancedSelection,
            },
        ));
    }

    let end = instructions.len();
    resolve_pending(&mut instructions, &top_level_guards, end);

    Ok(Code {
        instructions: instructions.into_boxed_slice(),
    })
}
