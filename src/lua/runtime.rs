use std::path::Path;

use mlua::{Function, Lua, Result as LuaResult, Value};

use crate::error::{Error, Result};
use crate::noise::HeightField;
use crate::state::{pack_rgb, Bitmap, Settings};

/// Per-call state the host bindings read and write.
///
/// Installed as Lua app data for the duration of a hook call and copied
/// back afterwards, so `Setting(name, value)` edits land in the caller's
/// proposed settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptContext {
    pub settings: Settings,
    /// Frame duration scaled so 1.0 is one frame at 60 Hz
    pub delta: f32,
}

impl ScriptContext {
    pub fn new(settings: Settings, delta: f32) -> Self {
        Self { settings, delta }
    }
}

/// One loaded script: a fresh Lua state with the host bindings installed and
/// the script body executed.
pub struct ScriptEngine {
    lua: Lua,
    name: String,
}

impl ScriptEngine {
    pub fn load(path: &Path, name: &str) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| Error::ScriptLoad {
            script: name.to_string(),
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_source(name, &source)
    }

    pub fn from_source(name: &str, source: &str) -> Result<Self> {
        let load_error = |e: mlua::Error| Error::ScriptLoad {
            script: name.to_string(),
            message: e.to_string(),
        };

        let lua = Lua::new();
        register_bindings(&lua).map_err(load_error)?;
        lua.load(source).set_name(name).exec().map_err(load_error)?;

        Ok(Self { lua, name: name.to_string() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A global function, if the script defined one under `name`.
    fn hook(&self, name: &str) -> Option<Function> {
        match self.lua.globals().get::<Value>(name) {
            Ok(Value::Function(f)) => Some(f),
            _ => None,
        }
    }

    fn with_context<R>(&self, ctx: &mut ScriptContext, f: impl FnOnce(&Lua) -> LuaResult<R>) -> LuaResult<R> {
        self.lua.set_app_data(*ctx);
        let result = f(&self.lua);
        if let Some(updated) = self.lua.remove_app_data::<ScriptContext>() {
            *ctx = updated;
        }
        result
    }

    fn runtime_error(&self, hook: &'static str, e: mlua::Error) -> Error {
        Error::ScriptRuntime {
            script: self.name.clone(),
            hook,
            message: e.to_string(),
        }
    }

    /// `preframe()`, called once per displayed frame.
    pub fn call_preframe(&self, ctx: &mut ScriptContext) -> Result<()> {
        let Some(f) = self.hook("preframe") else {
            return Ok(());
        };
        self.with_context(ctx, |_| f.call::<()>(()))
            .map_err(|e| self.runtime_error("preframe", e))
    }

    /// `heightmap(h, x, y, width, height)`, called per sample before
    /// classification. A returned number replaces the sample (clamped to
    /// 0..255); `nil` keeps it. Samples already rewritten stay rewritten if
    /// a later call fails.
    pub fn call_heightmap(&self, field: &mut HeightField, ctx: &mut ScriptContext) -> Result<()> {
        let Some(f) = self.hook("heightmap") else {
            return Ok(());
        };
        let (w, h) = (field.width(), field.height());
        self.with_context(ctx, |_| {
            for y in 0..h {
                for x in 0..w {
                    let idx = field.index(x, y);
                    let current = field.as_slice()[idx];
                    let out: Option<f64> = f.call((current, x, y, w, h))?;
                    if let Some(v) = out {
                        // NaN saturates to 0
                        field.as_mut_slice()[idx] = v.clamp(0.0, 255.0) as u8;
                    }
                }
            }
            Ok(())
        })
        .map_err(|e| self.runtime_error("heightmap", e))
    }

    /// `frame(bitmap)`, called once after classification with a façade
    /// that writes straight into `bitmap`.
    pub fn call_frame(&self, bitmap: &mut Bitmap, ctx: &mut ScriptContext) -> Result<()> {
        let Some(f) = self.hook("frame") else {
            return Ok(());
        };
        self.with_context(ctx, |lua| {
            lua.scope(|scope| {
                let canvas = scope.create_userdata_ref_mut(bitmap)?;
                f.call::<()>(canvas)
            })
        })
        .map_err(|e| self.runtime_error("frame", e))
    }
}

fn register_bindings(lua: &Lua) -> LuaResult<()> {
    let globals = lua.globals();

    globals.set(
        "RGB",
        lua.create_function(|_, (r, g, b): (i64, i64, i64)| Ok(pack_rgb(r as u8, g as u8, b as u8)))?,
    )?;

    // Setting(name) reads, Setting(name, value) writes the proposed settings
    globals.set(
        "Setting",
        lua.create_function(|lua, (name, value): (String, Option<f64>)| {
            let mut ctx = lua
                .app_data_mut::<ScriptContext>()
                .ok_or_else(|| mlua::Error::runtime("Setting() is only available inside hooks"))?;
            let unknown = || mlua::Error::runtime(format!("Unknown setting: '{}'", name));
            match value {
                None => ctx.settings.get(&name).map(Some).ok_or_else(unknown),
                Some(v) => {
                    if ctx.settings.set(&name, v) {
                        Ok(None)
                    } else {
                        Err(unknown())
                    }
                }
            }
        })?,
    )?;

    globals.set(
        "Delta",
        lua.create_function(|lua, ()| {
            Ok(lua.app_data_ref::<ScriptContext>().map(|ctx| ctx.delta).unwrap_or(0.0))
        })?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ScriptContext {
        ScriptContext::new(Settings::default(), 1.0)
    }

    #[test]
    fn test_missing_hooks_are_noops() {
        let engine = ScriptEngine::from_source("empty.lua", "local x = 1").unwrap();
        let mut c = ctx();
        let mut field = HeightField::new(2, 2);
        let mut bmp = Bitmap::new(2, 2);
        engine.call_preframe(&mut c).unwrap();
        engine.call_heightmap(&mut field, &mut c).unwrap();
        engine.call_frame(&mut bmp, &mut c).unwrap();
        assert_eq!(bmp, Bitmap::new(2, 2));
    }

    #[test]
    fn test_syntax_error_is_load_error() {
        let err = ScriptEngine::from_source("bad.lua", "function (").err().unwrap();
        assert!(matches!(err, Error::ScriptLoad { ref script, .. } if script == "bad.lua"));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = ScriptEngine::load(Path::new("/definitely/not/here.lua"), "here.lua").err().unwrap();
        assert!(matches!(err, Error::ScriptLoad { .. }));
    }

    #[test]
    fn test_preframe_edits_settings() {
        let src = r#"
            function preframe()
                Setting("zoff", Setting("zoff") + Delta() * 0.5)
                Setting("octaves", 3)
            end
        "#;
        let engine = ScriptEngine::from_source("anim.lua", src).unwrap();
        let mut c = ScriptContext::new(Settings::default(), 2.0);
        engine.call_preframe(&mut c).unwrap();
        assert_eq!(c.settings.z_offset, 1.0);
        assert_eq!(c.settings.octaves, 3);
    }

    #[test]
    fn test_unknown_setting_is_runtime_error() {
        let engine = ScriptEngine::from_source("typo.lua", "function preframe() Setting('seed', 1) end").unwrap();
        let mut c = ctx();
        let err = engine.call_preframe(&mut c).unwrap_err();
        match err {
            Error::ScriptRuntime { hook, message, .. } => {
                assert_eq!(hook, "preframe");
                assert!(message.contains("Unknown setting: 'seed'"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(c.settings, Settings::default());
    }

    #[test]
    fn test_heightmap_hook_clamps() {
        let src = r#"
            function heightmap(h, x, y, w, hh)
                if x == 0 then return h * 10 end
                if x == 1 then return -5 end
                return nil
            end
        "#;
        let engine = ScriptEngine::from_source("clamp.lua", src).unwrap();
        let mut field = HeightField::new(3, 1);
        field.as_mut_slice().copy_from_slice(&[100, 100, 100]);
        engine.call_heightmap(&mut field, &mut ctx()).unwrap();
        assert_eq!(field.as_slice(), &[255, 0, 100]);
    }

    #[test]
    fn test_frame_hook_writes_through() {
        let src = r#"
            function frame(b)
                for y = 0, b:height() - 1 do
                    for x = 0, b:width() - 1 do
                        local g = b:get(x, y)
                        b:pset(x, y, RGB(255 - g, 0, 0))
                    end
                end
            end
        "#;
        let engine = ScriptEngine::from_source("invert.lua", src).unwrap();
        let mut bmp = Bitmap::new(2, 2);
        bmp.set(0, 0, pack_rgb(10, 10, 10));
        engine.call_frame(&mut bmp, &mut ctx()).unwrap();
        assert_eq!(bmp.get(0, 0), Some(pack_rgb(245, 0, 0)));
        assert_eq!(bmp.get(1, 1), Some(pack_rgb(255, 0, 0)));
    }

    #[test]
    fn test_runtime_failure_keeps_partial_writes() {
        let src = r#"
            function frame(b)
                b:pset(0, 0, RGB(1, 2, 3))
                error("boom")
            end
        "#;
        let engine = ScriptEngine::from_source("partial.lua", src).unwrap();
        let mut bmp = Bitmap::new(1, 1);
        let err = engine.call_frame(&mut bmp, &mut ctx()).unwrap_err();
        assert!(matches!(err, Error::ScriptRuntime { hook: "frame", .. }));
        assert_eq!(bmp.get(0, 0), Some(pack_rgb(1, 2, 3)));
    }

    #[test]
    fn test_out_of_bounds_pset_errors() {
        let engine = ScriptEngine::from_source("oob.lua", "function frame(b) b:pset(5, 0, 1) end").unwrap();
        let mut bmp = Bitmap::new(2, 2);
        assert!(engine.call_frame(&mut bmp, &mut ctx()).is_err());
    }

    #[test]
    fn test_setting_outside_hook_fails_load() {
        let err = ScriptEngine::from_source("top.lua", "Setting('zoff', 1)").err().unwrap();
        assert!(matches!(err, Error::ScriptLoad { .. }));
    }
}
