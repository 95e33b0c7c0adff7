//! The step interpreter, responsible for walking a buffer with a validated definition.

use crate::error::RunError;
use crate::render;
use crate::state::{BlockFrame, LoopFrame, SelectionFrame, State};
use crate::value::{Value, Variable};
use bytescope::annotation::{Line, INVALID};
use bytescope::binary::Reader;
use bytescope::definition::{Condition, ExecStep, FieldStep, LoopStep, MatchStep, Operation, PrintStep, PrintValue, SizePolicy};
use bytescope::number::Endianness;
use bytescope::Annotations;
use bytescope_load::code::{Code, Instruction};
use bytescope_load::{index, Definition};

/// The result of walking a buffer.
#[derive(Debug)]
pub struct Walk {
    pub annotations: Annotations,
    /// Indicates why the walk stopped early, if it did.
    ///
    /// The annotations gathered before the walk stopped are kept either way.
    pub result: Result<(), RunError>,
}

/// Maximum number of consecutive loop iterations that only update variables.
const IDLE_ITERATION_LIMIT: usize = 0x10000;

enum Flow {
    Next(usize),
    Call(index::Block),
}

struct Interpreter<'d, 'b> {
    definition: &'d Definition,
    reader: Reader<'b>,
    state: State,
    annotations: Annotations,
}

/// Walks the buffer using the steps of the definition.
///
/// Walks never panic on malformed input: reads past the end of the buffer, undefined variables, and arithmetic failures
/// all degrade into error-colored ranges and markers. Any bytes left over after the program completes are tagged as
/// unrecognized.
pub fn run(definition: &Definition, buffer: &[u8]) -> Walk {
    log::debug!("walking {} bytes using definition {:?}", buffer.len(), definition.name());

    let mut interpreter = Interpreter {
        definition,
        reader: Reader::new(buffer),
        state: State::new(definition.nesting()),
        annotations: Annotations::new(),
    };

    interpreter.state.set_end_of_input(interpreter.reader.is_at_end());
    let result = interpreter.execute();
    let offset = interpreter.reader.offset();

    match &result {
        Ok(()) if !interpreter.reader.is_at_end() => interpreter.annotations.mark_unrecognized(offset, buffer.len()),
        Ok(()) => (),
        Err(RunError::StackOverflow { .. }) => interpreter.annotations.mark_unrecognized(offset, buffer.len()),
        Err(error) => log::debug!("walk using {:?} stopped at offset {:#X}: {}", definition.name(), offset, error),
    }

    log::debug!(
        "walk using {:?} produced {} ranges and {} lines",
        definition.name(),
        interpreter.annotations.ranges().len(),
        interpreter.annotations.lines().len()
    );

    Walk {
        annotations: interpreter.annotations,
        result,
    }
}

impl<'d, 'b> Interpreter<'d, 'b> {
    fn code(&self, block: Option<index::Block>) -> &'d Code {
        let definition = self.definition;
        match block {
            Some(block) => definition.block(block).code(),
            None => definition.code(),
        }
    }

    fn execute(&mut self) -> Result<(), RunError> {
        self.state.blocks.push(BlockFrame { block: None, next: 0 })?;

        loop {
            let (block, index) = match self.state.blocks.top_mut() {
                Some(frame) => (frame.block, frame.next),
                None => return Ok(()),
            };

            let code = self.code(block);
            let instruction = match code.instructions().get(index) {
                Some(instruction) => instruction,
                None => {
                    self.state.blocks.pop();
                    continue;
                }
            };

            log::trace!("{:#X}: {:?}", self.reader.offset(), instruction);

            match self.step(code, index, instruction)? {
                Flow::Next(next) => {
                    if let Some(frame) = self.state.blocks.top_mut() {
                        frame.next = next;
                    }
                }
                Flow::Call(callee) => {
                    if let Some(frame) = self.state.blocks.top_mut() {
                        frame.next = index + 1;
                    }

                    self.state.blocks.push(BlockFrame {
                        block: Some(callee),
                        next: 0,
                    })?;
                }
            }
        }
    }

    fn step(&mut self, code: &'d Code, index: usize, instruction: &'d Instruction) -> Result<Flow, RunError> {
        let next = index + 1;
        match instruction {
            Instruction::Field { field, step } => self.read_field(*field, step).map(|()| Flow::Next(next)),
            Instruction::Match {
                step,
                alternative,
                on_failure,
            } => {
                if *alternative {
                    let depth = self.state.match_depth();
                    let claimed = self.state.selections.top_mut().and_then(|frame| frame.claimed_at);
                    if claimed.map_or(false, |claimed| claimed < depth) {
                        return Ok(Flow::Next(*on_failure));
                    }
                }

                if !self.evaluate(step) {
                    return Ok(Flow::Next(*on_failure));
                }

                if *alternative {
                    let depth = self.state.match_depth();
                    if let Some(frame) = self.state.selections.top_mut() {
                        frame.claimed_at = Some(depth);
                    }
                    self.state.set_match_depth(depth + 1);
                }

                Ok(Flow::Next(next))
            }
            Instruction::LoopStart { step, end } => {
                let offset = self.reader.offset();
                if let Some(reason) = self.loop_limit_reached(step, offset) {
                    log::trace!("skipping loop at offset {:#X}, {}", offset, reason);
                    return Ok(Flow::Next(end + 1));
                }

                self.state.loops.push(LoopFrame {
                    start_offset: offset,
                    iteration_offset: offset,
                    iteration_generation: self.state.generation(),
                    idle_iterations: 0,
                })?;
                Ok(Flow::Next(next))
            }
            Instruction::LoopEnd { start } => {
                let step = match &code.instructions()[*start] {
                    Instruction::LoopStart { step, .. } => step,
                    _ => return Ok(Flow::Next(next)),
                };

                let offset = self.reader.offset();
                let generation = self.state.generation();
                let frame = match self.state.loops.top_mut() {
                    Some(frame) => frame.clone(),
                    None => return Ok(Flow::Next(next)),
                };

                let reason = self.loop_finished(step).or_else(|| self.loop_limit_reached(step, frame.start_offset));
                let idle = offset == frame.iteration_offset;
                let reason = reason.or_else(|| {
                    if !idle {
                        None
                    } else if generation == frame.iteration_generation {
                        log::warn!("loop made no progress at offset {:#X}, stopping", offset);
                        Some("no progress")
                    } else if frame.idle_iterations >= IDLE_ITERATION_LIMIT {
                        log::warn!("loop ran {} iterations at offset {:#X} without reading, stopping", IDLE_ITERATION_LIMIT, offset);
                        Some("too many iterations without reading")
                    } else {
                        None
                    }
                });

                match reason {
                    Some(reason) => {
                        log::trace!("leaving loop at offset {:#X}, {}", offset, reason);
                        self.state.loops.pop();
                        Ok(Flow::Next(next))
                    }
                    None => {
                        if let Some(frame) = self.state.loops.top_mut() {
                            frame.idle_iterations = if idle { frame.idle_iterations + 1 } else { 0 };
                            frame.iteration_offset = offset;
                            frame.iteration_generation = generation;
                        }
                        Ok(Flow::Next(start + 1))
                    }
                }
            }
            Instruction::SelectionStart { .. } => {
                self.state.selections.push(SelectionFrame {
                    base_depth: self.state.match_depth(),
                    claimed_at: None,
                })?;
                Ok(Flow::Next(next))
            }
            Instruction::SelectionEnd { .. } => {
                if let Some(frame) = self.state.selections.pop() {
                    self.state.set_match_depth(frame.base_depth);
                }
                Ok(Flow::Next(next))
            }
            Instruction::Print(step) => {
                self.print(step);
                Ok(Flow::Next(next))
            }
            Instruction::Exec(step) => {
                self.exec(step);
                Ok(Flow::Next(next))
            }
            Instruction::Block(block) => Ok(Flow::Call(*block)),
        }
    }

    fn read_field(&mut self, index: index::Field, step: &FieldStep) -> Result<(), RunError> {
        let field = self.definition.field(index);
        let definition = field.definition();
        let offset = self.reader.offset();
        let buffer_length = self.reader.len();

        let size = match &definition.size {
            SizePolicy::Fixed(size) => *size,
            SizePolicy::Remaining => self.reader.remaining(),
            SizePolicy::Variable(variable) => match self.state.variable(variable) {
                None => {
                    self.annotations.mark_unrecognized(offset, buffer_length);
                    return Err(RunError::UnboundSizeVariable(variable.clone()));
                }
                Some(Variable::Failed) => {
                    log::trace!("skipping {} since {} failed", definition.name, variable);
                    return Ok(());
                }
                Some(Variable::Bound(value)) => {
                    let value = *value;
                    let available = self.reader.remaining();
                    match value.as_unsigned().and_then(|size| usize::try_from(size).ok()) {
                        Some(size) if size <= available => size,
                        _ => {
                            self.state.fail(variable);
                            self.annotations.mark_incomplete(definition.label.clone(), offset, buffer_length);
                            return Err(RunError::UnreasonableSize {
                                variable: variable.clone(),
                                size: value.to_string(),
                                available,
                            });
                        }
                    }
                }
            },
            SizePolicy::Terminated(terminator) => match self.reader.advance_to(*terminator) {
                Some(distance) => distance + 1,
                None => {
                    self.annotations.mark_incomplete(definition.label.clone(), offset, buffer_length);
                    return Err(RunError::MissingTerminator {
                        terminator: *terminator,
                        offset,
                    });
                }
            },
        };

        let bytes = match self.reader.read(size) {
            Ok(bytes) => bytes,
            Err(error) => {
                self.annotations.mark_incomplete(definition.label.clone(), offset, buffer_length);
                return Err(error.into());
            }
        };

        self.state.set_end_of_input(self.reader.is_at_end());

        let endianness = if definition.convert_endianness {
            self.state.endianness(self.definition.endianness())
        } else {
            Endianness::Big
        };

        if let Some(variable) = &step.store {
            match render::stored_value(definition, bytes, endianness) {
                Some(value) => self.state.bind(variable, value),
                None => self.state.fail(variable),
            }
        }

        if size == 0 {
            return Ok(());
        }

        let printed = if step.print {
            render::field(definition, bytes, endianness)
        } else {
            None
        };

        let range = self.annotations.tag(offset, size, field.color(), definition.label.clone());
        range.background = field.is_background();
        if step.navigation {
            range.navigation_label = printed.clone();
        }

        if let Some(value) = printed {
            let mut line = Line::new(definition.label.clone(), value).with_tooltip(definition.tooltip());
            if step.new_section {
                line = line.starting_section();
            }
            self.annotations.describe_to(step.tab.as_deref(), line);
        }

        if step.embed {
            self.annotations.embed(definition.label.clone(), offset, size);
        }

        Ok(())
    }

    fn evaluate(&self, step: &MatchStep) -> bool {
        let value = self.state.value(&step.variable);
        let operand = match step.condition {
            Condition::Defined => return value.is_some() != step.negate,
            _ => step.operand.as_ref().and_then(|operand| self.state.operand(operand)),
        };

        // Undefined and failed variables never satisfy a comparison, even a negated one.
        let (value, operand) = match (value, operand) {
            (Some(value), Some(operand)) => (value, operand),
            _ => {
                log::trace!("match on {} failed closed", step.variable);
                return false;
            }
        };

        let result = match step.condition {
            Condition::Defined => true,
            Condition::Equals => match (value.as_integer(), operand.as_integer()) {
                (Some(value), Some(operand)) => value == operand,
                _ => value == operand,
            },
            Condition::GreaterThan => match (value.as_integer(), operand.as_integer()) {
                (Some(value), Some(operand)) => value > operand,
                _ => false,
            },
            Condition::BitTest => match (value.to_bits(), operand.to_bits()) {
                (Some(value), Some(operand)) => value & operand != 0,
                _ => false,
            },
        };

        result != step.negate
    }

    /// Checked when a loop is entered and after every iteration.
    fn loop_limit_reached(&self, step: &LoopStep, start_offset: usize) -> Option<&'static str> {
        if let Some(limit) = &step.limit {
            match self.state.value(limit).and_then(|value| value.as_unsigned()) {
                None => return Some("limit is undefined"),
                Some(limit) if (self.reader.offset() - start_offset) as u64 >= limit => return Some("limit reached"),
                Some(_) => (),
            }
        }

        if self.state.is_end_of_input() {
            Some("end of input")
        } else {
            None
        }
    }

    /// Checked after every iteration.
    fn loop_finished(&self, step: &LoopStep) -> Option<&'static str> {
        let until = step.until.as_ref()?;
        let value = self.state.value(&until.variable);
        let expected = self.state.operand(&until.equals);
        match (value, expected) {
            (Some(value), Some(expected)) => {
                let equal = match (value.as_integer(), expected.as_integer()) {
                    (Some(value), Some(expected)) => value == expected,
                    _ => value == expected,
                };

                if equal {
                    Some("condition met")
                } else {
                    None
                }
            }
            _ => Some("condition is undefined"),
        }
    }

    fn print(&mut self, step: &PrintStep) {
        let value = match &step.value {
            PrintValue::Literal(text) => Some(text.clone()),
            PrintValue::Variable(name) => self.state.value(name).map(|value| value.to_string()),
            PrintValue::Hex(name) => self
                .state
                .value(name)
                .and_then(|value| value.to_bits())
                .map(|bits| format!("{:#X}", bits)),
        };

        let value = match value {
            Some(value) => value,
            None if step.omit_if_undefined => return,
            None => INVALID.to_string(),
        };

        let mut line = Line::new(step.label.clone(), value).with_margin(step.margin);
        if let Some(tooltip) = &step.tooltip {
            line = line.with_tooltip(tooltip.clone());
        }
        if step.new_section {
            line = line.starting_section();
        }

        self.annotations.describe_to(step.tab.as_deref(), line);
    }

    fn exec(&mut self, step: &ExecStep) {
        match self.arithmetic(step) {
            Some(value) => self.state.bind(&step.variable, value),
            None => {
                log::debug!("{:?} of {} failed", step.operation, step.variable);
                self.state.fail(&step.variable);
                self.annotations.describe(Line::new(step.variable.to_string(), INVALID));
            }
        }
    }

    fn arithmetic(&self, step: &ExecStep) -> Option<Value> {
        let operand = self.state.operand(&step.operand)?;
        if step.operation == Operation::Set {
            return Some(operand);
        }

        let current = self.state.value(&step.variable)?;
        if step.signed {
            let current = i64::try_from(current.as_integer()?).ok()?;
            let operand = i64::try_from(operand.as_integer()?).ok()?;
            match step.operation {
                Operation::Set => Some(operand),
                Operation::Add => current.checked_add(operand),
                Operation::Subtract => current.checked_sub(operand),
                Operation::Multiply => current.checked_mul(operand),
                Operation::Divide => current.checked_div(operand),
                Operation::Modulo => current.checked_rem(operand),
            }
            .map(Value::I64)
        } else {
            let current = current.as_unsigned()?;
            let operand = operand.as_unsigned()?;
            match step.operation {
                Operation::Set => Some(operand),
                Operation::Add => current.checked_add(operand),
                Operation::Subtract => current.checked_sub(operand),
                Operation::Multiply => current.checked_mul(operand),
                Operation::Divide => current.checked_div(operand),
                Operation::Modulo => current.checked_rem(operand),
            }
            .map(Value::U64)
        }
    }
}
