use nvim_oxi::Result;
use nvim_oxi::mlua;
use texsync_nvim_oxi_utils::handles::BufHandle;
use texsync_nvim_oxi_utils::lua;

const BRIDGE_MODULE: &str = "texsync.bridge";

fn bridge_table(lua: &mlua::Lua) -> Result<mlua::Table> {
    lua::require_table(lua, BRIDGE_MODULE)
}

fn call_bridge<A, R>(name: &str, args: A) -> Result<R>
where
    A: mlua::IntoLuaMulti,
    R: mlua::FromLuaMulti,
{
    let lua = lua::state();
    let bridge = bridge_table(&lua)?;
    lua::call_table_function(&bridge, name, args)
}

/// Hand a JSON message to the rendering target. Returns whether the target
/// accepted it.
pub fn post(buf_handle: BufHandle, json: String) -> Result<bool> {
    let accepted: Option<bool> = call_bridge("post", (buf_handle.raw(), json))?;
    Ok(accepted.unwrap_or(true))
}

/// Move the cursor of the source window showing `buf_handle` to `line`.
pub fn reveal_line(buf_handle: BufHandle, line: u32) -> Result<()> {
    call_bridge("reveal_line", (buf_handle.raw(), line))
}

pub fn set_status(buf_handle: BufHandle, text: String) -> Result<()> {
    call_bridge("set_status", (buf_handle.raw(), text))
}
