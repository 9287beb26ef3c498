// Re-export all public modules so they can be used from main.rs
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::closure::Closure;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue, prelude::wasm_bindgen};
#[cfg(target_arch = "wasm32")]
use web_sys::{Window, Document, HtmlCanvasElement, MouseEvent, TouchEvent, WheelEvent, Event};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;

#[cfg(target_arch = "wasm32")]
use controller::{CanvasRect, FrameLoopContext, InputEvent, InputState, PickTracker, PointerUpdate};
#[cfg(target_arch = "wasm32")]
use model::ScenePreset;
#[cfg(target_arch = "wasm32")]
use view::{GpuContext, RenderState};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await
}

/// Main application setup for WASM
#[cfg(target_arch = "wasm32")]
async fn setup_app(
    window: &Window,
    _document: &Document,
    canvas: &HtmlCanvasElement,
) -> Result<(), JsValue> {
    // `#picking` in the URL selects a builtin preset
    let hash = window.location().hash().unwrap_or_default();
    let preset = ScenePreset::resolve(Some(hash.trim_start_matches('#')));

    let (width, height) = canvas_pixel_size(window, canvas);
    canvas.set_width(width);
    canvas.set_height(height);

    // Initialize GPU
    let gpu = GpuContext::new(canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;

    let mut render_state = RenderState::new(
        gpu.device.as_ref(),
        gpu.queue.as_ref(),
        gpu.format,
        gpu.config.alpha_mode,
        gpu.config.width,
        gpu.config.height,
    );
    let mut frame_ctx = FrameLoopContext::new(&preset, gpu.config.width, gpu.config.height);

    // egui setup
    let egui_ctx = egui::Context::default();
    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));

    // Setup input listeners
    setup_input_listeners(
        window,
        canvas,
        frame_ctx.input_state.clone(),
        frame_ctx.pick.clone(),
        egui_events.clone(),
    )?;

    // Continuous redraw using requestAnimationFrame
    let f = RcCellCallback::new(window.clone(), {
        let window = window.clone();
        let canvas = canvas.clone();

        move |time_ms: f64| {
            let measured = canvas_pixel_size(&window, &canvas);
            let report = frame_ctx.tick(time_ms, measured);
            if let Some((w, h)) = report.resized {
                canvas.set_width(w);
                canvas.set_height(h);
                render_state.resize(gpu.device.as_ref(), &gpu.surface, w, h);
            }

            // Build egui input from queued events
            let dpr = window.device_pixel_ratio() as f32;
            let mut raw_input = egui::RawInput::default();
            raw_input.time = Some(time_ms / 1000.0);
            raw_input.screen_rect = Some(egui::Rect::from_min_size(
                egui::Pos2::new(0.0, 0.0),
                egui::vec2(
                    render_state.width as f32 / dpr,
                    render_state.height as f32 / dpr,
                ),
            ));
            raw_input.events.extend(egui_events.borrow_mut().drain(..));
            egui_ctx.set_pixels_per_point(dpr);

            let mut full_output = ui::build_ui(&egui_ctx, raw_input, &mut frame_ctx, render_state.width);
            let primitives = egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
            render_state.egui_primitives = Some(primitives);
            render_state.egui_full_output = Some(full_output);
            render_state.egui_dpr = dpr;

            render_state.sync_scene(gpu.device.as_ref(), gpu.queue.as_ref(), &frame_ctx.scene, &frame_ctx.camera);
            if let Err(e) = render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, &frame_ctx.scene) {
                tracing::warn!("frame skipped: {e}");
            }
        }
    });
    f.start()?;

    Ok(())
}

/// Feed an event to the orbit input and forward pointer changes to the
/// pick tracker
#[cfg(target_arch = "wasm32")]
fn route_input(
    event: InputEvent,
    canvas: &HtmlCanvasElement,
    input_state: &RefCell<InputState>,
    pick: &RefCell<PickTracker>,
) {
    match input_state.borrow_mut().process_event(&event) {
        Some(PointerUpdate::Moved(client)) => {
            let rect = canvas.get_bounding_client_rect();
            let rect = CanvasRect {
                left: rect.left() as f32,
                top: rect.top() as f32,
                width: rect.width() as f32,
                height: rect.height() as f32,
            };
            pick.borrow_mut().set_from_client(client, &rect, (canvas.width(), canvas.height()));
        }
        Some(PointerUpdate::Cleared) => pick.borrow_mut().clear(),
        None => {}
    }
}

/// Setup all input event listeners with platform-agnostic abstractions
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    window: &Window,
    canvas: &HtmlCanvasElement,
    input_state: Rc<RefCell<InputState>>,
    pick: Rc<RefCell<PickTracker>>,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), JsValue> {
    use controller::input::wasm as web_input;

    // Mouse move
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_mm = canvas.clone();
        let egui_events_q = egui_events.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            egui_events_q
                .borrow_mut()
                .push(egui::Event::PointerMoved(egui::pos2(e.client_x() as f32, e.client_y() as f32)));
            route_input(web_input::pointer_move_to_input(&e), &canvas_mm, &input_state, &pick);
        }) as Box<dyn FnMut(MouseEvent)>);
        window.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Pointer leaving the page clears the pick
    for event_name in ["mouseout", "mouseleave"] {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_leave = canvas.clone();
        let egui_events_q = egui_events.clone();
        let leave = Closure::wrap(Box::new(move |_e: MouseEvent| {
            egui_events_q.borrow_mut().push(egui::Event::PointerGone);
            route_input(InputEvent::PointerLeave, &canvas_leave, &input_state, &pick);
        }) as Box<dyn FnMut(MouseEvent)>);
        window.add_event_listener_with_callback(event_name, leave.as_ref().unchecked_ref())?;
        leave.forget();
    }

    // Touch start must be non-passive so it can stop the page from scrolling
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_ts = canvas.clone();
        let touchstart = Closure::wrap(Box::new(move |e: TouchEvent| {
            e.prevent_default();
            if let Some(event) = web_input::touch_to_input(&e, true) {
                route_input(event, &canvas_ts, &input_state, &pick);
            }
        }) as Box<dyn FnMut(TouchEvent)>);
        let options = web_sys::AddEventListenerOptions::new();
        options.set_passive(false);
        window.add_event_listener_with_callback_and_add_event_listener_options(
            "touchstart",
            touchstart.as_ref().unchecked_ref(),
            &options,
        )?;
        touchstart.forget();
    }

    // Touch move
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_tm = canvas.clone();
        let touchmove = Closure::wrap(Box::new(move |e: TouchEvent| {
            if let Some(event) = web_input::touch_to_input(&e, false) {
                route_input(event, &canvas_tm, &input_state, &pick);
            }
        }) as Box<dyn FnMut(TouchEvent)>);
        window.add_event_listener_with_callback("touchmove", touchmove.as_ref().unchecked_ref())?;
        touchmove.forget();
    }

    // Touch end
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_te = canvas.clone();
        let touchend = Closure::wrap(Box::new(move |_e: TouchEvent| {
            route_input(InputEvent::TouchEnd, &canvas_te, &input_state, &pick);
        }) as Box<dyn FnMut(TouchEvent)>);
        window.add_event_listener_with_callback("touchend", touchend.as_ref().unchecked_ref())?;
        touchend.forget();
    }

    // Mouse down - start an orbit drag
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_md = canvas.clone();
        let egui_events_q = egui_events.clone();
        let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
            egui_events_q.borrow_mut().push(egui_button_event(&e, true));
            route_input(web_input::pointer_down_to_input(&e), &canvas_md, &input_state, &pick);
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }

    // Mouse up anywhere ends the drag
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_mu = canvas.clone();
        let egui_events_q = egui_events.clone();
        let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
            egui_events_q.borrow_mut().push(egui_button_event(&e, false));
            route_input(web_input::pointer_up_to_input(&e), &canvas_mu, &input_state, &pick);
        }) as Box<dyn FnMut(MouseEvent)>);
        window.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
        mouseup.forget();
    }

    // Mouse wheel zooms the orbit camera
    {
        let input_state = input_state.clone();
        let pick = pick.clone();
        let canvas_wh = canvas.clone();
        let wheel = Closure::wrap(Box::new(move |e: WheelEvent| {
            route_input(web_input::wheel_to_input(&e), &canvas_wh, &input_state, &pick);
            e.prevent_default();
        }) as Box<dyn FnMut(WheelEvent)>);
        canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
        wheel.forget();
    }

    // Focus loss - stop dragging
    {
        let input_state = input_state.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            input_state.borrow_mut().process_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn egui_button_event(e: &MouseEvent, pressed: bool) -> egui::Event {
    let button = match e.button() {
        1 => egui::PointerButton::Middle,
        2 => egui::PointerButton::Secondary,
        _ => egui::PointerButton::Primary,
    };
    egui::Event::PointerButton {
        pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
        button,
        pressed,
        modifiers: egui::Modifiers::default(),
    }
}

/// Use the page's `<canvas id="c">` when present, otherwise create a
/// full-window one
#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;

    if let Some(existing) = document.get_element_by_id("c") {
        let canvas_el = existing
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("#c is not a canvas"))?;
        return Ok((window, document, canvas_el));
    }

    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    let style = canvas_el.style();
    style.set_property("display", "block")?;
    style.set_property("width", "100vw")?;
    style.set_property("height", "100vh")?;
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

/// Displayed canvas size in physical pixels
#[cfg(target_arch = "wasm32")]
fn canvas_pixel_size(window: &Window, canvas: &HtmlCanvasElement) -> (u32, u32) {
    let dpr = window.device_pixel_ratio();
    let width = (canvas.client_width() as f64 * dpr).floor() as u32;
    let height = (canvas.client_height() as f64 * dpr).floor() as u32;
    (width, height)
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// requestAnimationFrame loop that keeps itself alive
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut(f64)>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut(f64) + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) -> Result<(), JsValue> {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut(f64)>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |time_ms: f64| {
            inner.borrow_mut().as_mut()(time_ms);

            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    tracing::error!("requestAnimationFrame failed: {e:?}");
                }
            }
        }) as Box<dyn FnMut(f64)>));

        if let Some(cb) = callback.borrow().as_ref() {
            self.window.request_animation_frame(cb.as_ref().unchecked_ref())?;
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
        Ok(())
    }
}
