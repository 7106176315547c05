use std::cell::RefCell;

use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{UrlSearchParams, Window};

use crate::config::Config;
use crate::lifecycle::Sources;

mod context;
mod player;

pub use player::Player;

const SOURCES: Sources<'static> = Sources {
    vertex: include_str!("../../shaders/vertex.glsl"),
    image: include_str!("../../shaders/image.glsl"),
    sound: include_str!("../../shaders/sound.glsl"),
};

thread_local! {
    static PLAYER: RefCell<Option<Player>> = const { RefCell::new(None) };
}

fn page_config(window: &Window) -> Result<Config, JsValue> {
    let search = window.location().search()?;
    let params = UrlSearchParams::new_with_str(&search)?;
    Ok(Config::from_lookup(|key| params.get(key))?)
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let window = web_sys::window().ok_or("no window")?;
    let config = page_config(&window)?;
    if let Some(level) = config.log_level.to_level() {
        console_log::init_with_level(level).ok();
    }

    let document = window.document().ok_or("no document")?;
    let canvas = document
        .get_element_by_id(&config.canvas_id)
        .ok_or("canvas not found")?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;

    let player = Player::launch(&window, canvas, &config, SOURCES)
        .and_then(|player| player.start().map(|()| player));
    let player = match player {
        Ok(player) => player,
        Err(err) => {
            // Shader diagnostics are for whoever is looking at the page.
            error!("{err}");
            window.alert_with_message(&err.to_string()).ok();
            return Err(err.into());
        }
    };

    info!("shadersynth started on #{}", config.canvas_id);
    PLAYER.with(|slot| *slot.borrow_mut() = Some(player));
    Ok(())
}

/// Stops rendering and audio for good.
#[wasm_bindgen]
pub fn stop() {
    if let Some(player) = PLAYER.with(|slot| slot.borrow_mut().take()) {
        player.stop();
    }
}
