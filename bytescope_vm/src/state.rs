//! Mutable state of a single walk.

use crate::error::RunError;
use crate::value::{Value, Variable};
use bytescope::definition::{DefinitionEndianness, Operand};
use bytescope::number::Endianness;
use bytescope::{Id, Identifier};
use bytescope_load::code::Nesting;
use bytescope_load::index;
use std::fmt::{Debug, Formatter};

/// A stack whose depth is bounded by the nesting found when the definition was validated.
pub struct Stack<T> {
    kind: &'static str,
    frames: Vec<T>,
    limit: usize,
}

impl<T> Stack<T> {
    fn with_limit(kind: &'static str, limit: usize) -> Self {
        Self {
            kind,
            frames: Vec::with_capacity(limit),
            limit,
        }
    }

    pub(crate) fn push(&mut self, frame: T) -> Result<(), RunError> {
        if self.frames.len() >= self.limit {
            log::warn!("{} stack overflowed its limit of {}", self.kind, self.limit);
            return Err(RunError::StackOverflow {
                kind: self.kind,
                limit: self.limit,
            });
        }

        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        self.frames.pop()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut T> {
        self.frames.last_mut()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl<T: Debug> Debug for Stack<T> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.frames.iter().rev()).finish()
    }
}

#[derive(Clone, Debug)]
pub struct LoopFrame {
    /// Offset of the cursor when the loop was entered.
    pub start_offset: usize,
    /// Offset of the cursor when the current iteration began.
    pub iteration_offset: usize,
    /// Variable generation when the current iteration began.
    pub iteration_generation: u64,
    /// Number of consecutive iterations that read no bytes.
    pub idle_iterations: usize,
}

#[derive(Clone, Debug)]
pub struct SelectionFrame {
    /// Match depth when the selection was entered.
    pub base_depth: usize,
    /// Match depth at which an alternative claimed the selection.
    pub claimed_at: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct BlockFrame {
    /// The block being executed, or `None` for the main program.
    pub block: Option<index::Block>,
    pub next: usize,
}

/// Variables and scope stacks of a walk, created fresh for every buffer.
pub struct State {
    variables: rustc_hash::FxHashMap<Identifier, Variable>,
    pub(crate) loops: Stack<LoopFrame>,
    pub(crate) selections: Stack<SelectionFrame>,
    pub(crate) blocks: Stack<BlockFrame>,
    /// Incremented whenever a variable binding changes.
    generation: u64,
    match_depth: usize,
    end_of_input: bool,
}

impl State {
    pub fn new(nesting: Nesting) -> Self {
        Self {
            variables: Default::default(),
            loops: Stack::with_limit("loop", nesting.loops),
            selections: Stack::with_limit("selection", nesting.selections),
            // The main program occupies the first frame.
            blocks: Stack::with_limit("block", nesting.blocks + 1),
            generation: 0,
            match_depth: 0,
            end_of_input: false,
        }
    }

    pub fn variable(&self, name: &Id) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Gets the value of a variable that is bound and has not failed.
    pub fn value(&self, name: &Id) -> Option<Value> {
        self.variable(name).and_then(Variable::value)
    }

    pub fn operand(&self, operand: &Operand) -> Option<Value> {
        match operand {
            Operand::Literal(value) => Some(Value::U64(*value)),
            Operand::Variable(name) => self.value(name),
        }
    }

    pub fn bind(&mut self, name: &Id, value: Value) {
        log::trace!("{} = {}", name, value);
        self.set(name, Variable::Bound(value));
    }

    pub fn fail(&mut self, name: &Id) {
        log::trace!("{} failed", name);
        self.set(name, Variable::Failed);
    }

    fn set(&mut self, name: &Id, variable: Variable) {
        if self.variables.insert(name.to_owned(), variable) != Some(variable) {
            self.generation += 1;
        }
    }

    /// Changes whenever a variable is bound to a different value or fails.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves the byte order of the definition, which may depend on a variable read earlier in the walk.
    pub fn endianness(&self, endianness: &DefinitionEndianness) -> Endianness {
        match endianness {
            DefinitionEndianness::Big => Endianness::Big,
            DefinitionEndianness::Little => Endianness::Little,
            DefinitionEndianness::Variable {
                variable,
                big_endian_value,
            } => {
                if self.value(variable).and_then(|value| value.as_unsigned()) == Some(*big_endian_value) {
                    Endianness::Big
                } else {
                    Endianness::Little
                }
            }
        }
    }

    #[inline]
    pub fn match_depth(&self) -> usize {
        self.match_depth
    }

    pub(crate) fn set_match_depth(&mut self, depth: usize) {
        self.match_depth = depth;
    }

    #[inline]
    pub fn is_end_of_input(&self) -> bool {
        self.end_of_input
    }

    pub(crate) fn set_end_of_input(&mut self, end_of_input: bool) {
        self.end_of_input = end_of_input;
    }

    #[inline]
    pub fn loops(&self) -> &Stack<LoopFrame> {
        &self.loops
    }

    #[inline]
    pub fn selections(&self) -> &Stack<SelectionFrame> {
        &self.selections
    }

    #[inline]
    pub fn blocks(&self) -> &Stack<BlockFrame> {
        &self.blocks
    }
}

impl Debug for State {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("State")
            .field("variables", &self.variables)
            .field("generation", &self.generation)
            .field("loops", &self.loops)
            .field("selections", &self.selections)
            .field("blocks", &self.blocks)
            .field("match_depth", &self.match_depth)
            .field("end_of_input", &self.end_of_input)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> Identifier {
        Identifier::try_from(text).unwrap()
    }

    #[test]
    fn variable_endianness_follows_binding() {
        let mut state = State::new(Nesting::default());
        let endianness = DefinitionEndianness::Variable {
            variable: name("order"),
            big_endian_value: 0x4D4D,
        };

        assert_eq!(state.endianness(&endianness), Endianness::Little);
        state.bind(&name("order"), Value::U16(0x4D4D));
        assert_eq!(state.endianness(&endianness), Endianness::Big);
        state.fail(&name("order"));
        assert_eq!(state.endianness(&endianness), Endianness::Little);
    }

    #[test]
    fn generation_tracks_changed_bindings() {
        let mut state = State::new(Nesting::default());
        let counter = name("counter");

        state.bind(&counter, Value::U64(0));
        let generation = state.generation();
        state.bind(&counter, Value::U64(0));
        assert_eq!(state.generation(), generation);
        state.bind(&counter, Value::U64(1));
        assert_eq!(state.generation(), generation + 1);
        state.fail(&counter);
        state.fail(&counter);
        assert_eq!(state.generation(), generation + 2);
    }

    #[test]
    fn stacks_are_bounded() {
        let mut state = State::new(Nesting {
            loops: 1,
            selections: 0,
            blocks: 0,
        });

        let frame = LoopFrame {
            start_offset: 0,
            iteration_offset: 0,
            iteration_generation: 0,
            idle_iterations: 0,
        };
        assert!(state.loops.push(frame.clone()).is_ok());
        assert_eq!(
            state.loops.push(frame),
            Err(RunError::StackOverflow { kind: "loop", limit: 1 })
        );
        assert_eq!(state.blocks().limit(), 1);
    }
}
