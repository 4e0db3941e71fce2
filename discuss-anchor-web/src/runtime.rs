//! Browser event loop glue
//!
//! The runtime lives in a thread-local slot. Every observer, listener and
//! timer callback pushes a [`PageEvent`] onto the channel and calls [`wake`],
//! which pumps the orchestrator and re-arms a single `setTimeout` for the next
//! deadline.

use std::cell::RefCell;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{unbounded, Sender};
use discuss_anchor_core::heading::ANCHOR_CLASS;
use discuss_anchor_core::page::{PageEvent, Selector, SelectorList};
use discuss_anchor_core::toc::ITEM_CLASS;
use discuss_anchor_core::{Config, Orchestrator};
use log::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventTarget, MutationObserver,
    MutationObserverInit, MutationRecord, Window,
};

use crate::clock;
use crate::page::{describe, WebPage};

type MutationCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// An installed event listener, removed on shutdown
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn install(
        target: EventTarget,
        kind: &'static str,
        callback: impl FnMut(Event) + 'static,
    ) -> Result<Self> {
        let callback: Closure<dyn FnMut(Event)> = Closure::new(callback);
        target
            .add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())
            .map_err(|e| anyhow!("Failed to listen for {kind}: {}", describe(&e)))?;
        Ok(Self {
            target,
            kind,
            callback,
        })
    }

    fn uninstall(&self) {
        if let Err(e) = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref())
        {
            debug!("Failed to remove {} listener: {}", self.kind, describe(&e));
        }
    }
}

struct Runtime {
    window: Window,
    orchestrator: Orchestrator<WebPage>,
    listeners: Vec<Listener>,
    mutations: (MutationObserver, MutationCallback),
    tick: Closure<dyn FnMut()>,
    timer: Option<i32>,
}

impl Runtime {
    fn now(&self) -> Duration {
        let ms = self
            .window
            .performance()
            .map(|performance| performance.now())
            .unwrap_or(0.0);
        clock::from_millis_f64(ms)
    }

    fn pump(&mut self) {
        let now = self.now();
        self.orchestrator.pump(now);
        self.rearm(now);
    }

    fn click(&mut self, control: &Element) -> bool {
        let handled = self.orchestrator.click(control);
        self.pump();
        handled
    }

    /// Replace the pending wake-up with one for the next deadline
    fn rearm(&mut self, now: Duration) {
        if let Some(handle) = self.timer.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        let Some(deadline) = self.orchestrator.next_deadline() else {
            return;
        };
        let delay = clock::delay_ms(deadline, now);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                self.tick.as_ref().unchecked_ref(),
                delay,
            ) {
            Ok(handle) => self.timer = Some(handle),
            Err(e) => error!("[Main] Failed to arm timer: {}", describe(&e)),
        }
    }

    fn teardown(mut self) {
        for listener in &self.listeners {
            listener.uninstall();
        }
        self.mutations.0.disconnect();
        if let Some(handle) = self.timer.take() {
            self.window.clear_timeout_with_handle(handle);
        }
        self.orchestrator.shutdown();
    }
}

/// Send `event` to the orchestrator and process it
fn dispatch(events: &Sender<PageEvent<Element>>, event: PageEvent<Element>) {
    if events.send(event).is_ok() {
        wake();
    }
}

/// Pump the running orchestrator. Does nothing while it is already being
/// pumped; queued events are picked up by that pump.
pub(crate) fn wake() {
    RUNTIME.with(|slot| {
        let Ok(mut slot) = slot.try_borrow_mut() else {
            return;
        };
        if let Some(runtime) = slot.as_mut() {
            runtime.pump();
        }
    });
}

pub fn is_running() -> bool {
    RUNTIME.with(|slot| slot.try_borrow().map(|r| r.is_some()).unwrap_or(true))
}

/// Start the pipeline once the document has been parsed
pub fn boot(config: Config) -> Result<()> {
    config.validate()?;
    if is_running() {
        warn!("[Main] Already running");
        return Ok(());
    }

    let window = web_sys::window().context("No window")?;
    let document = window.document().context("No document")?;

    if document.ready_state() == "loading" {
        let deferred = Closure::once_into_js(move || {
            if let Err(e) = install(config) {
                error!("[Main] Failed to start: {e:#}");
            }
        });
        document
            .add_event_listener_with_callback("DOMContentLoaded", deferred.unchecked_ref())
            .map_err(|e| anyhow!("Failed to wait for DOMContentLoaded: {}", describe(&e)))?;
        return Ok(());
    }

    install(config)
}

/// Remove every observer, listener and timer and revert the page
pub fn shutdown() {
    let runtime = RUNTIME.with(|slot| match slot.try_borrow_mut() {
        Ok(mut slot) => slot.take(),
        Err(_) => {
            warn!("[Main] Cannot stop while the pipeline is running");
            None
        }
    });
    if let Some(runtime) = runtime {
        runtime.teardown();
        info!("[Main] Stopped");
    }
}

fn install(config: Config) -> Result<()> {
    if is_running() {
        return Ok(());
    }

    let window = web_sys::window().context("No window")?;
    let document = window.document().context("No document")?;
    let body = document.body().context("Document has no body")?;

    let (tx, rx) = unbounded();
    let page = WebPage::new(window.clone(), document.clone(), tx.clone());
    let orchestrator = Orchestrator::new(config, page, rx)?;

    let listeners = install_listeners(&window, &document, &tx)?;
    let mutations = observe_mutations(&body, &tx)?;
    let tick: Closure<dyn FnMut()> = Closure::new(wake);

    let mut runtime = Runtime {
        window,
        orchestrator,
        listeners,
        mutations,
        tick,
        timer: None,
    };
    let now = runtime.now();
    runtime.orchestrator.start(now);
    runtime.rearm(now);

    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
    Ok(())
}

fn install_listeners(
    window: &Window,
    document: &Document,
    events: &Sender<PageEvent<Element>>,
) -> Result<Vec<Listener>> {
    let window_target: EventTarget = window.clone().into();
    let document_target: EventTarget = document.clone().into();

    let popstate = events.clone();
    let hashchange = events.clone();
    let turbo = events.clone();

    Ok(vec![
        Listener::install(window_target.clone(), "popstate", move |_| {
            dispatch(&popstate, PageEvent::HistoryNavigated)
        })?,
        Listener::install(window_target, "hashchange", move |_| {
            dispatch(&hashchange, PageEvent::FragmentChanged)
        })?,
        Listener::install(document_target.clone(), "turbo:load", move |_| {
            dispatch(&turbo, PageEvent::AppNavigated)
        })?,
        Listener::install(document_target, "click", on_click)?,
    ])
}

/// Delegated click handling for anchor controls and sidebar entries
fn on_click(event: Event) {
    let Some(target) = event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
    else {
        return;
    };
    let controls = SelectorList::new([Selector::Class(ANCHOR_CLASS), Selector::Class(ITEM_CLASS)]);
    let Ok(Some(control)) = target.closest(&controls.to_string()) else {
        return;
    };

    let handled = RUNTIME.with(|slot| match slot.try_borrow_mut() {
        Ok(mut slot) => slot
            .as_mut()
            .map(|runtime| runtime.click(&control))
            .unwrap_or(false),
        Err(_) => false,
    });
    if handled {
        event.prevent_default();
    }
}

/// Report element insertions anywhere under `body`
fn observe_mutations(
    body: &Element,
    events: &Sender<PageEvent<Element>>,
) -> Result<(MutationObserver, MutationCallback)> {
    let events = events.clone();
    let callback: MutationCallback = Closure::new(
        move |records: js_sys::Array, _observer: MutationObserver| {
            let mut added = Vec::new();
            for record in records.iter() {
                let Ok(record) = record.dyn_into::<MutationRecord>() else {
                    continue;
                };
                let nodes = record.added_nodes();
                added.extend(
                    (0..nodes.length())
                        .filter_map(|i| nodes.item(i))
                        .filter_map(|node| node.dyn_into::<Element>().ok()),
                );
            }
            if !added.is_empty() {
                dispatch(&events, PageEvent::NodesAdded(added));
            }
        },
    );

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
        .map_err(|e| anyhow!("Failed to create MutationObserver: {}", describe(&e)))?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer
        .observe_with_options(body, &options)
        .map_err(|e| anyhow!("Failed to observe body: {}", describe(&e)))?;
    Ok((observer, callback))
}
