// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Immutable, shareable script modules and the builder that assembles them.

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::errors::ModuleError;
use crate::opcode::{Offset, Op, PieceId, ScriptId};

/// A named entry point into a module's instruction vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub offset: Offset,
    /// Number of arguments copied into the first locals of a new frame.
    #[serde(default)]
    pub params: u16,
    /// Total local slots of a frame for this entry point, parameters included.
    #[serde(default)]
    pub locals: u16,
}

/// Serializable description of a module, as handed over by an asset pipeline or written by hand
/// for tools and tests. Turned into a [`Module`] by [`Module::from_definition`], which validates
/// every cross reference.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    #[serde(default)]
    pub pieces: Vec<String>,
    #[serde(default)]
    pub statics: u16,
    pub scripts: Vec<EntryPoint>,
    pub code: Vec<Op>,
}

/// A compiled unit script: instructions, piece and entry point symbol tables, and the number of
/// static variable slots each instance needs. Cheap to clone; all clones share the same code.
#[derive(Clone, Debug)]
pub struct Module(Arc<ModuleInner>);

#[derive(Debug)]
struct ModuleInner {
    code: Vec<Op>,
    pieces: Vec<String>,
    piece_index: AHashMap<String, PieceId>,
    scripts: Vec<EntryPoint>,
    script_index: AHashMap<String, ScriptId>,
    static_count: u16,
}

impl Module {
    pub fn from_definition(definition: ModuleDefinition) -> Result<Self, ModuleError> {
        let ModuleDefinition {
            pieces,
            statics,
            scripts,
            code,
        } = definition;

        let mut piece_index = AHashMap::with_capacity(pieces.len());
        for (i, name) in pieces.iter().enumerate() {
            let id = u16::try_from(i).map_err(|_| ModuleError::TooManyPieces(pieces.len()))?;
            if piece_index.insert(name.clone(), PieceId(id)).is_some() {
                return Err(ModuleError::DuplicatePiece(name.clone()));
            }
        }

        let mut script_index = AHashMap::with_capacity(scripts.len());
        for (i, entry) in scripts.iter().enumerate() {
            let id = u16::try_from(i).map_err(|_| ModuleError::TooManyScripts(scripts.len()))?;
            if script_index
                .insert(entry.name.clone(), ScriptId(id))
                .is_some()
            {
                return Err(ModuleError::DuplicateEntryPoint(entry.name.clone()));
            }
            if entry.params > entry.locals {
                return Err(ModuleError::ParamsExceedLocals {
                    name: entry.name.clone(),
                    params: entry.params,
                    locals: entry.locals,
                });
            }
            if entry.offset.as_usize() >= code.len() {
                return Err(ModuleError::EntryOutOfRange {
                    name: entry.name.clone(),
                    offset: entry.offset,
                });
            }
        }

        for (at, op) in code.iter().enumerate() {
            if let Some(target) = op.jump_target()
                && target.as_usize() >= code.len()
            {
                return Err(ModuleError::JumpOutOfRange { at, target });
            }
            if let Some(piece) = op.piece()
                && piece.index() >= pieces.len()
            {
                return Err(ModuleError::PieceOutOfRange { at, piece });
            }
            if let Some(slot) = op.static_slot()
                && slot >= statics
            {
                return Err(ModuleError::StaticOutOfRange {
                    at,
                    slot,
                    count: statics,
                });
            }
            if let Op::CallScript { script, argc } | Op::StartScript { script, argc } = *op {
                let Some(entry) = scripts.get(script.index()) else {
                    return Err(ModuleError::ScriptOutOfRange { at, script });
                };
                if u16::from(argc) > entry.locals {
                    return Err(ModuleError::TooManyArguments {
                        at,
                        name: entry.name.clone(),
                        argc,
                        locals: entry.locals,
                    });
                }
            }
        }

        Ok(Module(Arc::new(ModuleInner {
            code,
            pieces,
            piece_index,
            scripts,
            script_index,
            static_count: statics,
        })))
    }

    /// Produce the description this module was built from.
    pub fn definition(&self) -> ModuleDefinition {
        ModuleDefinition {
            pieces: self.0.pieces.clone(),
            statics: self.0.static_count,
            scripts: self.0.scripts.clone(),
            code: self.0.code.clone(),
        }
    }

    #[inline]
    pub fn instruction_at(&self, ip: usize) -> Option<Op> {
        self.0.code.get(ip).copied()
    }

    pub fn code(&self) -> &[Op] {
        &self.0.code
    }

    pub fn entry_point(&self, name: &str) -> Result<ScriptId, ModuleError> {
        self.0
            .script_index
            .get(name)
            .copied()
            .ok_or_else(|| ModuleError::UnknownEntryPoint(name.to_string()))
    }

    pub fn entry_point_offset(&self, name: &str) -> Result<Offset, ModuleError> {
        let id = self.entry_point(name)?;
        Ok(self.0.scripts[id.index()].offset)
    }

    pub fn has_entry_point(&self, name: &str) -> bool {
        self.0.script_index.contains_key(name)
    }

    #[inline]
    pub fn script(&self, id: ScriptId) -> Option<&EntryPoint> {
        self.0.scripts.get(id.index())
    }

    pub fn scripts(&self) -> &[EntryPoint] {
        &self.0.scripts
    }

    pub fn piece_index(&self, name: &str) -> Result<PieceId, ModuleError> {
        self.0
            .piece_index
            .get(name)
            .copied()
            .ok_or_else(|| ModuleError::UnknownPiece(name.to_string()))
    }

    pub fn piece_name(&self, id: PieceId) -> Option<&str> {
        self.0.pieces.get(id.index()).map(String::as_str)
    }

    pub fn piece_count(&self) -> usize {
        self.0.pieces.len()
    }

    pub fn static_slot_count(&self) -> usize {
        self.0.static_count as usize
    }

    /// True if both handles share the same compiled code.
    pub fn ptr_eq(&self, other: &Module) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Assembles a module instruction by instruction. Scripts may be declared before their bodies are
/// emitted so that calls can reference scripts defined later in the code.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    pieces: Vec<String>,
    statics: u16,
    scripts: Vec<EntryPoint>,
    defined: Vec<bool>,
    code: Vec<Op>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a piece, or return the id of an already declared one.
    pub fn piece(&mut self, name: &str) -> PieceId {
        if let Some(i) = self.pieces.iter().position(|p| p == name) {
            return PieceId(i as u16);
        }
        self.pieces.push(name.to_string());
        PieceId((self.pieces.len() - 1) as u16)
    }

    pub fn static_slots(&mut self, count: u16) -> &mut Self {
        self.statics = count;
        self
    }

    /// Declare an entry point whose body will be placed later with [`Self::define_script`].
    pub fn declare_script(&mut self, name: &str, params: u16, locals: u16) -> ScriptId {
        if let Some(i) = self.scripts.iter().position(|s| s.name == name) {
            return ScriptId(i as u16);
        }
        self.scripts.push(EntryPoint {
            name: name.to_string(),
            offset: Offset(0),
            params,
            locals,
        });
        self.defined.push(false);
        ScriptId((self.scripts.len() - 1) as u16)
    }

    /// Start the body of a declared script at the current position.
    pub fn define_script(&mut self, id: ScriptId) {
        let position = self.position();
        self.scripts[id.index()].offset = position;
        self.defined[id.index()] = true;
    }

    pub fn begin_script(&mut self, name: &str, params: u16, locals: u16) -> ScriptId {
        let id = self.declare_script(name, params, locals);
        self.define_script(id);
        id
    }

    /// The offset the next emitted instruction will occupy.
    pub fn position(&self) -> Offset {
        Offset::from(self.code.len())
    }

    pub fn emit(&mut self, op: Op) -> usize {
        self.code.push(op);
        self.code.len() - 1
    }

    pub fn emit_all(&mut self, ops: impl IntoIterator<Item = Op>) -> &mut Self {
        self.code.extend(ops);
        self
    }

    /// Point an already emitted jump at `target`.
    pub fn patch_jump(&mut self, at: usize, target: Offset) -> Result<(), ModuleError> {
        match self.code.get_mut(at) {
            Some(Op::Jump(t)) | Some(Op::JumpIfZero(t)) => {
                *t = target;
                Ok(())
            }
            _ => Err(ModuleError::NotAJump(at)),
        }
    }

    pub fn build(self) -> Result<Module, ModuleError> {
        if let Some(i) = self.defined.iter().position(|d| !d) {
            return Err(ModuleError::UndefinedEntryPoint(
                self.scripts[i].name.clone(),
            ));
        }
        Module::from_definition(ModuleDefinition {
            pieces: self.pieces,
            statics: self.statics,
            scripts: self.scripts,
            code: self.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Axis;
    use pretty_assertions::assert_eq;

    fn create_module() -> Module {
        let mut b = ModuleBuilder::new();
        let base = b.piece("base");
        b.static_slots(1);
        b.begin_script("Create", 0, 0);
        b.emit_all([
            Op::PushConstant(5),
            Op::PushConstant(3),
            Op::Add,
            Op::PopStaticVariable(0),
            Op::ReturnFromScript,
        ]);
        b.begin_script("Open", 1, 2);
        b.emit_all([
            Op::PushLocalVariable(0),
            Op::PushConstant(0),
            Op::MoveObject {
                piece: base,
                axis: Axis::Y,
            },
            Op::ReturnFromScript,
        ]);
        b.build().unwrap()
    }

    #[test]
    fn test_symbol_lookup() {
        let module = create_module();
        assert_eq!(module.entry_point("Create"), Ok(ScriptId(0)));
        assert_eq!(module.entry_point_offset("Open"), Ok(Offset(5)));
        assert_eq!(module.piece_index("base"), Ok(PieceId(0)));
        assert_eq!(module.piece_name(PieceId(0)), Some("base"));
        assert_eq!(module.static_slot_count(), 1);
        assert_eq!(module.instruction_at(2), Some(Op::Add));
        assert_eq!(module.instruction_at(99), None);
    }

    #[test]
    fn test_unknown_symbols() {
        let module = create_module();
        assert_eq!(
            module.entry_point("Killed"),
            Err(ModuleError::UnknownEntryPoint("Killed".to_string()))
        );
        assert_eq!(
            module.piece_index("turret"),
            Err(ModuleError::UnknownPiece("turret".to_string()))
        );
    }

    #[test]
    fn test_clones_share_code() {
        let module = create_module();
        let other = module.clone();
        assert!(module.ptr_eq(&other));
    }

    #[test]
    fn test_forward_declared_call() {
        let mut b = ModuleBuilder::new();
        let helper = b.declare_script("Helper", 1, 1);
        b.begin_script("Main", 0, 0);
        b.emit_all([
            Op::PushConstant(1),
            Op::CallScript {
                script: helper,
                argc: 1,
            },
            Op::ReturnFromScript,
        ]);
        b.define_script(helper);
        b.emit(Op::ReturnFromScript);
        let module = b.build().unwrap();
        assert_eq!(module.scripts()[helper.index()].offset, Offset(3));
    }

    #[test]
    fn test_undefined_script_rejected() {
        let mut b = ModuleBuilder::new();
        b.declare_script("Ghost", 0, 0);
        b.begin_script("Main", 0, 0);
        b.emit(Op::ReturnFromScript);
        assert_eq!(
            b.build().unwrap_err(),
            ModuleError::UndefinedEntryPoint("Ghost".to_string())
        );
    }

    #[test]
    fn test_patch_jump() {
        let mut b = ModuleBuilder::new();
        b.begin_script("Main", 0, 0);
        b.emit(Op::PushConstant(0));
        let jz = b.emit(Op::JumpIfZero(Offset(0)));
        b.emit(Op::PushConstant(1));
        let end = b.position();
        b.emit(Op::ReturnFromScript);
        b.patch_jump(jz, end).unwrap();
        assert_eq!(b.patch_jump(0, end), Err(ModuleError::NotAJump(0)));
        let module = b.build().unwrap();
        assert_eq!(module.instruction_at(1), Some(Op::JumpIfZero(Offset(3))));
    }

    #[test]
    fn test_validation_rejects_bad_references() {
        let definition = ModuleDefinition {
            pieces: vec!["base".to_string()],
            statics: 1,
            scripts: vec![EntryPoint {
                name: "Main".to_string(),
                offset: Offset(0),
                params: 0,
                locals: 0,
            }],
            code: vec![Op::Jump(Offset(10))],
        };
        assert_eq!(
            Module::from_definition(definition.clone()).unwrap_err(),
            ModuleError::JumpOutOfRange {
                at: 0,
                target: Offset(10)
            }
        );

        let bad_piece = ModuleDefinition {
            code: vec![Op::ShowObject(PieceId(4))],
            ..definition.clone()
        };
        assert_eq!(
            Module::from_definition(bad_piece).unwrap_err(),
            ModuleError::PieceOutOfRange {
                at: 0,
                piece: PieceId(4)
            }
        );

        let bad_static = ModuleDefinition {
            code: vec![Op::PushStaticVariable(1)],
            ..definition.clone()
        };
        assert_eq!(
            Module::from_definition(bad_static).unwrap_err(),
            ModuleError::StaticOutOfRange {
                at: 0,
                slot: 1,
                count: 1
            }
        );

        let too_many_args = ModuleDefinition {
            code: vec![Op::StartScript {
                script: ScriptId(0),
                argc: 2,
            }],
            ..definition
        };
        assert!(matches!(
            Module::from_definition(too_many_args),
            Err(ModuleError::TooManyArguments { argc: 2, .. })
        ));
    }

    #[test]
    fn test_id_space_is_bounded() {
        let too_many_pieces = ModuleDefinition {
            pieces: (0..=u16::MAX as usize + 1).map(|i| format!("p{i}")).collect(),
            statics: 0,
            scripts: vec![],
            code: vec![Op::ReturnFromScript],
        };
        assert_eq!(
            Module::from_definition(too_many_pieces).unwrap_err(),
            ModuleError::TooManyPieces(65537)
        );

        let too_many_scripts = ModuleDefinition {
            pieces: vec![],
            statics: 0,
            scripts: (0..=u16::MAX as usize + 1)
                .map(|i| EntryPoint {
                    name: format!("s{i}"),
                    offset: Offset(0),
                    params: 0,
                    locals: 0,
                })
                .collect(),
            code: vec![Op::ReturnFromScript],
        };
        assert_eq!(
            Module::from_definition(too_many_scripts).unwrap_err(),
            ModuleError::TooManyScripts(65537)
        );
    }

    #[test]
    fn test_definition_loads_from_json() {
        let json = r#"{
            "pieces": ["base", "turret"],
            "statics": 2,
            "scripts": [{"name": "Create", "offset": 0}],
            "code": [
                {"PushConstant": 5},
                {"PopStaticVariable": 1},
                {"TurnObjectNow": {"piece": 1, "axis": "Y"}},
                "ReturnFromScript"
            ]
        }"#;
        let definition: ModuleDefinition = serde_json::from_str(json).unwrap();
        let module = Module::from_definition(definition.clone()).unwrap();
        assert_eq!(module.piece_index("turret"), Ok(PieceId(1)));
        assert_eq!(module.definition(), definition);
    }
}
