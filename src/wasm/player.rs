use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::{debug, error, info, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    AudioContext, AudioContextState, AudioProcessingEvent, HtmlCanvasElement,
    ScriptProcessorNode, WebGl2RenderingContext as GL, Window,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lifecycle::{AudioFormat, Contexts, Coordinator, Sources};

const GESTURES: [&str; 2] = ["pointerdown", "keydown"];

/// Browser host for a [`Coordinator`]: owns the display-refresh subscription,
/// the audio node and the window listeners that feed it.
pub struct Player {
    shared: Rc<Shared>,
}

struct Shared {
    coordinator: RefCell<Coordinator<GL, HtmlCanvasElement>>,
    window: Window,
    audio: AudioContext,
    node: ScriptProcessorNode,
    request_id: Cell<Option<i32>>,
    audio_wired: Cell<bool>,
    // Closures hold `Weak<Shared>`, so these do not keep `Shared` alive.
    frame: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    on_audio: RefCell<Option<Closure<dyn FnMut(AudioProcessingEvent)>>>,
    on_resize: RefCell<Option<Closure<dyn FnMut()>>>,
    on_gesture: RefCell<Option<Closure<dyn FnMut()>>>,
}

fn webgl2(canvas: &HtmlCanvasElement) -> Result<GL> {
    canvas
        .get_context("webgl2")?
        .ok_or_else(|| Error::Platform("WebGL2 not supported".into()))?
        .dyn_into::<GL>()
        .map_err(Error::platform)
}

fn window_size(window: &Window) -> Result<(u32, u32)> {
    let width = window.inner_width()?.as_f64().unwrap_or(0.0);
    let height = window.inner_height()?.as_f64().unwrap_or(0.0);
    Ok((width as u32, height as u32))
}

impl Player {
    /// Acquires both contexts and the audio engine and builds the pipelines.
    ///
    /// Nothing is scheduled until [`Player::start`].
    pub fn launch(
        window: &Window,
        canvas: HtmlCanvasElement,
        config: &Config,
        sources: Sources<'_>,
    ) -> Result<Self> {
        let document = window
            .document()
            .ok_or_else(|| Error::Platform("no document".into()))?;
        let sound_canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(Error::platform)?;

        let render_gl = webgl2(&canvas)?;
        let sound_gl = webgl2(&sound_canvas)?;

        let audio = AudioContext::new()?;
        let node = match config.buffer_size {
            Some(frames) => audio.create_script_processor_with_buffer_size(frames)?,
            None => audio.create_script_processor()?,
        };
        let format = AudioFormat {
            buffer_size: node.buffer_size() as usize,
            sample_rate: audio.sample_rate(),
        };

        let now = window
            .performance()
            .ok_or_else(|| Error::Platform("no performance clock".into()))?
            .now();
        let mut coordinator = Coordinator::new();
        coordinator.initialize(
            Contexts {
                render: render_gl,
                sound: sound_gl,
                surface: canvas,
            },
            sources,
            format,
            window_size(window)?,
            now,
        )?;

        Ok(Self {
            shared: Rc::new(Shared {
                coordinator: RefCell::new(coordinator),
                window: window.clone(),
                audio,
                node,
                request_id: Cell::new(None),
                audio_wired: Cell::new(false),
                frame: RefCell::new(None),
                on_audio: RefCell::new(None),
                on_resize: RefCell::new(None),
                on_gesture: RefCell::new(None),
            }),
        })
    }

    /// Starts the render loop and requests audio. Audio callbacks begin once
    /// the browser lets the context resume, which may need a user gesture.
    pub fn start(&self) -> Result<()> {
        let shared = &self.shared;
        shared.coordinator.borrow_mut().start()?;

        let weak = Rc::downgrade(shared);
        *shared.frame.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            if let Some(shared) = weak.upgrade() {
                shared.on_frame(timestamp);
            }
        }) as Box<dyn FnMut(f64)>));
        shared.request_frame()?;

        let weak = Rc::downgrade(shared);
        let resize = Closure::wrap(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                if let Err(err) = shared.on_resize() {
                    warn!("resize failed: {err}");
                }
            }
        }) as Box<dyn FnMut()>);
        shared
            .window
            .add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;
        *shared.on_resize.borrow_mut() = Some(resize);

        let frames = shared.node.buffer_size() as usize;
        let (mut left, mut right) = (vec![0.0; frames], vec![0.0; frames]);
        let weak = Rc::downgrade(shared);
        *shared.on_audio.borrow_mut() = Some(Closure::wrap(Box::new(
            move |event: AudioProcessingEvent| {
                if let Some(shared) = weak.upgrade() {
                    if let Err(err) = shared.on_audio(&event, &mut left, &mut right) {
                        error!("audio callback failed: {err}");
                    }
                }
            },
        ) as Box<dyn FnMut(AudioProcessingEvent)>));

        let weak = Rc::downgrade(shared);
        let gesture = Closure::wrap(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                if shared.audio.state() == AudioContextState::Suspended {
                    resume_audio(&shared);
                }
            }
        }) as Box<dyn FnMut()>);
        for kind in GESTURES {
            shared
                .window
                .add_event_listener_with_callback(kind, gesture.as_ref().unchecked_ref())?;
        }
        *shared.on_gesture.borrow_mut() = Some(gesture);

        resume_audio(shared);
        Ok(())
    }

    pub fn stop(&self) {
        self.shared.stop();
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shared.stop();
    }
}

fn resume_audio(shared: &Rc<Shared>) {
    let promise = match shared.audio.resume() {
        Ok(promise) => promise,
        Err(err) => {
            warn!("audio resume refused: {err:?}");
            return;
        }
    };
    let weak = Rc::downgrade(shared);
    spawn_local(async move {
        if let Err(err) = JsFuture::from(promise).await {
            warn!("audio resume failed: {err:?}");
            return;
        }
        if let Some(shared) = weak.upgrade() {
            if let Err(err) = shared.wire_audio() {
                error!("could not connect audio: {err}");
            }
        }
    });
}

impl Shared {
    fn request_frame(&self) -> Result<()> {
        let frame = self.frame.borrow();
        let Some(callback) = frame.as_ref() else {
            return Ok(());
        };
        let id = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())?;
        self.request_id.set(Some(id));
        Ok(())
    }

    fn on_frame(&self, timestamp: f64) {
        self.request_id.set(None);
        let keep_going = self.coordinator.borrow_mut().render(timestamp);
        match keep_going {
            Ok(true) => {
                if let Err(err) = self.request_frame() {
                    error!("could not schedule next frame: {err}");
                }
            }
            Ok(false) => debug!("render loop finished"),
            Err(err) => error!("render failed: {err}"),
        }
    }

    fn on_resize(&self) -> Result<()> {
        let (width, height) = window_size(&self.window)?;
        self.coordinator.borrow_mut().resize(width, height)
    }

    fn on_audio(
        &self,
        event: &AudioProcessingEvent,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<()> {
        let output = event.output_buffer()?;
        if self.coordinator.borrow_mut().process_audio(left, right)? {
            output.copy_to_channel(left, 0)?;
            output.copy_to_channel(right, 1)?;
        }
        Ok(())
    }

    /// Connects the node once the context is running; later calls are no-ops.
    fn wire_audio(&self) -> Result<()> {
        if self.audio_wired.get() || !self.coordinator.borrow().phase().is_running() {
            return Ok(());
        }
        let callback = self.on_audio.borrow();
        let Some(callback) = callback.as_ref() else {
            return Ok(());
        };
        self.node
            .set_onaudioprocess(Some(callback.as_ref().unchecked_ref()));
        self.node
            .connect_with_audio_node(&self.audio.destination())?;
        self.audio_wired.set(true);
        info!("audio connected at {} Hz", self.audio.sample_rate());
        Ok(())
    }

    fn stop(&self) {
        let was_running = self.coordinator.borrow().phase().is_running();
        self.coordinator.borrow_mut().stop();

        if let Some(id) = self.request_id.take() {
            if let Err(err) = self.window.cancel_animation_frame(id) {
                warn!("cancel_animation_frame failed: {err:?}");
            }
        }
        self.node.set_onaudioprocess(None);
        if self.audio_wired.replace(false) {
            if let Err(err) = self.node.disconnect() {
                warn!("audio node disconnect failed: {err:?}");
            }
        }
        if let Some(resize) = self.on_resize.borrow_mut().take() {
            let _ = self
                .window
                .remove_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());
        }
        if let Some(gesture) = self.on_gesture.borrow_mut().take() {
            for kind in GESTURES {
                let _ = self
                    .window
                    .remove_event_listener_with_callback(kind, gesture.as_ref().unchecked_ref());
            }
        }
        if was_running {
            info!("player torn down");
        }
    }
}
