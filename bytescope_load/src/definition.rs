//! Validated format definitions.

use crate::code::{self, Code, Nesting};
use crate::error::{InvalidDefinitionError, InvalidDefinitionKind, StepLocation};
use crate::index;
use bytescope::definition::{DefinitionEndianness, FieldDefinition, FormatDefinition, SizePolicy, Step};
use bytescope::{Color, Id, Identifier};
use std::fmt::{Debug, Formatter};

type Lookup<I> = rustc_hash::FxHashMap<Identifier, I>;

/// A field definition whose color has been resolved.
#[derive(Clone, Debug)]
pub struct Field {
    definition: FieldDefinition,
    color: Color,
    background: bool,
}

impl Field {
    #[inline]
    pub fn definition(&self) -> &FieldDefinition {
        &self.definition
    }

    #[inline]
    pub fn name(&self) -> &Id {
        &self.definition.name
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Whether the color applies to the background of the bytes instead of their text.
    #[inline]
    pub fn is_background(&self) -> bool {
        self.background
    }
}

/// A named, reusable list of steps.
#[derive(Clone, Debug)]
pub struct Block {
    name: Identifier,
    code: Code,
}

impl Block {
    #[inline]
    pub fn name(&self) -> &Id {
        &self.name
    }

    #[inline]
    pub fn code(&self) -> &Code {
        &self.code
    }
}

/// Bytes expected at a fixed offset.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MagicBytes {
    pub offset: usize,
    pub bytes: Box<[u8]>,
}

impl MagicBytes {
    pub fn matches(&self, buffer: &[u8]) -> bool {
        self.offset
            .checked_add(self.bytes.len())
            .and_then(|end| buffer.get(self.offset..end))
            .map_or(false, |actual| actual == &*self.bytes)
    }
}

/// A format definition that has been checked for consistency and compiled.
///
/// Definitions are immutable once validated.
pub struct Definition {
    name: String,
    description: Option<String>,
    endianness: DefinitionEndianness,
    magic: Box<[MagicBytes]>,
    fields: Box<[Field]>,
    blocks: Box<[Block]>,
    code: Code,
    nesting: Nesting,
}

impl Definition {
    /// Validates a definition, compiling its steps and the steps of all of its blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition refers to colors, fields, or blocks that do not exist, if its loops or selections
    /// are unbalanced, if its magic numbers are inconsistent, or if its blocks call themselves.
    pub fn validate(definition: FormatDefinition) -> Result<Self, InvalidDefinitionError> {
        let name = definition.name.trim().to_string();
        let fail = |kind: InvalidDefinitionKind, location: Option<StepLocation>| {
            InvalidDefinitionError::new(kind, &name, location)
        };

        if name.is_empty() {
            return Err(fail(InvalidDefinitionKind::MissingName, None));
        }

        let magic = definition
            .magic
            .iter()
            .enumerate()
            .map(|(index, magic)| -> Result<MagicBytes, InvalidDefinitionError> {
                let bytes = magic
                    .bytes()
                    .ok_or_else(|| fail(InvalidDefinitionKind::InvalidMagicValue { index }, None))?;

                if bytes.len() != magic.size {
                    return Err(fail(
                        InvalidDefinitionKind::MagicSizeMismatch {
                            index,
                            expected: magic.size,
                            actual: bytes.len(),
                        },
                        None,
                    ));
                }

                Ok(MagicBytes {
                    offset: magic.offset,
                    bytes: bytes.into_boxed_slice(),
                })
            })
            .collect::<Result<Box<[_]>, _>>()?;

        let mut colors = Lookup::<(Color, bool)>::default();
        for color in definition.colors.iter() {
            let value = color.value.parse::<Color>().map_err(|source| {
                fail(
                    InvalidDefinitionKind::InvalidColor {
                        name: color.name.clone(),
                        source,
                    },
                    None,
                )
            })?;

            if colors.insert(color.name.clone(), (value, color.background)).is_some() {
                return Err(fail(duplicate("color", &color.name), None));
            }
        }

        let mut field_lookup = Lookup::default();
        let mut fields = Vec::with_capacity(definition.fields.len());
        for field in definition.fields.into_iter() {
            let (color, background) = *colors
                .get(&field.color)
                .ok_or_else(|| fail(InvalidDefinitionKind::UnknownColor(field.color.clone()), None))?;

            if field.size == SizePolicy::Fixed(0) {
                return Err(fail(InvalidDefinitionKind::EmptyField(field.name.clone()), None));
            }

            if field_lookup.insert(field.name.clone(), index::Field::from(fields.len())).is_some() {
                return Err(fail(duplicate("field", &field.name), None));
            }

            fields.push(Field {
                definition: field,
                color,
                background,
            });
        }

        let mut block_lookup = Lookup::default();
        for (index, block) in definition.blocks.iter().enumerate() {
            if block_lookup.insert(block.name.clone(), index::Block::from(index)).is_some() {
                return Err(fail(duplicate("block", &block.name), None));
            }
        }

        let compile = |steps: &[Step], block: Option<&Identifier>| -> Result<Code, InvalidDefinitionError> {
            check_stored_widths(steps, &fields, &field_lookup).map_err(|(index, kind)| {
                fail(
                    kind,
                    Some(StepLocation {
                        block: block.cloned(),
                        index,
                    }),
                )
            })?;

            code::compile(
                steps,
                |name| field_lookup.get(name).copied(),
                |name| block_lookup.get(name).copied(),
            )
            .map_err(|(index, kind)| {
                fail(
                    kind,
                    Some(StepLocation {
                        block: block.cloned(),
                        index,
                    }),
                )
            })
        };

        let code = compile(&definition.steps, None)?;
        let blocks = definition
            .blocks
            .iter()
            .map(|block| -> Result<Block, InvalidDefinitionError> {
                Ok(Block {
                    name: block.name.clone(),
                    code: compile(&block.steps, Some(&block.name))?,
                })
            })
            .collect::<Result<Box<[_]>, _>>()?;

        let nesting = measure_nesting(&code, &blocks).map_err(|block| fail(InvalidDefinitionKind::RecursiveBlock(block), None))?;

        log::debug!("validated definition {:?} with {} fields and {} blocks", name, fields.len(), blocks.len());

        Ok(Self {
            name,
            description: definition.description,
            endianness: definition.endianness,
            magic,
            fields: fields.into_boxed_slice(),
            blocks,
            code,
            nesting,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[inline]
    pub fn endianness(&self) -> &DefinitionEndianness {
        &self.endianness
    }

    #[inline]
    pub fn magic(&self) -> &[MagicBytes] {
        &self.magic
    }

    /// Returns `true` if any of the definition's magic numbers are present in the buffer.
    ///
    /// A definition without magic numbers never matches.
    pub fn matches(&self, buffer: &[u8]) -> bool {
        self.magic.iter().any(|magic| magic.matches(buffer))
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    pub fn field(&self, index: index::Field) -> &Field {
        &self.fields[usize::from(index)]
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn block(&self, index: index::Block) -> &Block {
        &self.blocks[usize::from(index)]
    }

    /// The main program of the definition.
    #[inline]
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// The deepest nesting of loops, selections, and block calls reachable from the main program.
    #[inline]
    pub fn nesting(&self) -> Nesting {
        self.nesting
    }
}

impl Debug for Definition {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("endianness", &self.endianness)
            .field("magic", &self.magic)
            .field("fields", &self.fields.len())
            .field("blocks", &self.blocks.len())
            .field("nesting", &self.nesting)
            .finish()
    }
}

fn duplicate(kind: &'static str, name: &Identifier) -> InvalidDefinitionKind {
    InvalidDefinitionKind::DuplicateName {
        kind,
        name: name.clone(),
    }
}

/// Variables hold integers of 1, 2, 4, or 8 bytes, so fixed-size fields of any other width cannot be stored.
fn check_stored_widths(
    steps: &[Step],
    fields: &[Field],
    lookup: &Lookup<index::Field>,
) -> Result<(), (usize, InvalidDefinitionKind)> {
    for (index, step) in steps.iter().enumerate() {
        if let Step::Field(step) = step {
            if step.store.is_none() {
                continue;
            }

            let field = match lookup.get(&step.field) {
                Some(field) => &fields[usize::from(*field)],
                None => continue,
            };

            if let SizePolicy::Fixed(width) = field.definition.size {
                if !matches!(width, 1 | 2 | 4 | 8) {
                    return Err((
                        index,
                        InvalidDefinitionKind::UnstorableWidth {
                            field: step.field.clone(),
                            width,
                        },
                    ));
                }
            }
        }
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum Visit {
    InProgress,
    Done(Nesting),
}

/// Computes the deepest nesting along any chain of block calls, returning the name of a block that calls itself (directly
/// or through other blocks) if there is one.
fn measure_nesting(main: &Code, blocks: &[Block]) -> Result<Nesting, Identifier> {
    fn visit(code: &Code, blocks: &[Block], visits: &mut [Option<Visit>]) -> Result<Nesting, Identifier> {
        let mut nesting = code.own_nesting();
        for (callee, at) in code.block_calls() {
            let index = usize::from(callee);
            let inner = match visits[index] {
                Some(Visit::Done(inner)) => inner,
                Some(Visit::InProgress) => return Err(blocks[index].name.clone()),
                None => {
                    visits[index] = Some(Visit::InProgress);
                    let inner = visit(&blocks[index].code, blocks, visits)?;
                    visits[index] = Some(Visit::Done(inner));
                    inner
                }
            };

            nesting = nesting.max(at.add(inner).add(Nesting {
                blocks: 1,
                ..Nesting::default()
            }));
        }

        Ok(nesting)
    }

    let mut visits = vec![None; blocks.len()];
    let nesting = visit(main, blocks, &mut visits)?;

    // Blocks that are never called from the main program must still be free of cycles.
    for index in 0..blocks.len() {
        if visits[index].is_none() {
            visits[index] = Some(Visit::InProgress);
            let inner = visit(&blocks[index].code, blocks, &mut visits)?;
            visits[index] = Some(Visit::Done(inner));
        }
    }

    Ok(nesting)
}
