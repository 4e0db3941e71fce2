//! Lifecycle orchestration: when the heading/TOC pipeline runs
//!
//! The orchestrator is host-driven. The host forwards [`PageEvent`]s through a
//! channel, calls [`Orchestrator::pump`] with the current time whenever
//! something happened, and arms a single timer for
//! [`Orchestrator::next_deadline`].

use anyhow::Result;
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use std::time::Duration;

use crate::config::Config;
use crate::heading::{self, HeadingProcessor};
use crate::page::{Page, PageEvent, ScrollBlock};
use crate::timer::{Debouncer, Schedule};
use crate::toast::{self, ToastStep};
use crate::toc::Toc;

/// Deferred work
#[derive(Debug, Clone, PartialEq)]
pub enum Task<N> {
    /// First pipeline run after the page settles
    Startup,
    /// Pipeline run after history or app navigation
    Settled,
    /// Scroll to the heading named by the fragment at scheduling time
    ScrollToFragment(String),
    Toast(N, ToastStep),
}

/// Owns the page, the heading processor and the TOC, and decides when they run
pub struct Orchestrator<P: Page> {
    config: Config,
    page: P,
    processor: HeadingProcessor<P::Node>,
    toc: Toc<P::Node>,
    debounce: Debouncer,
    schedule: Schedule<Task<P::Node>>,
    events: Receiver<PageEvent<P::Node>>,
    started: bool,
    runs: u64,
}

impl<P: Page> Orchestrator<P> {
    /// Create an orchestrator; fails only on an invalid configuration
    pub fn new(config: Config, page: P, events: Receiver<PageEvent<P::Node>>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            processor: HeadingProcessor::new(&config),
            toc: Toc::new(&config),
            debounce: Debouncer::new(config.timing.debounce()),
            schedule: Schedule::new(),
            config,
            page,
            events,
            started: false,
            runs: 0,
        })
    }

    /// Schedule the first pipeline run after the startup delay
    pub fn start(&mut self, now: Duration) {
        if self.started {
            return;
        }
        self.started = true;
        info!("[Main] Initializing...");
        self.schedule
            .push(now + self.config.timing.startup_delay(), Task::Startup);
    }

    /// Handle queued events, then fire whatever is due, until nothing changes
    pub fn pump(&mut self, now: Duration) {
        loop {
            let mut busy = false;
            while let Ok(event) = self.events.try_recv() {
                self.handle(event, now);
                busy = true;
            }
            if self.advance(now) {
                busy = true;
            }
            if !busy {
                break;
            }
        }
    }

    pub fn handle(&mut self, event: PageEvent<P::Node>, now: Duration) {
        match event {
            PageEvent::NodesAdded(nodes) => {
                let relevant = nodes.iter().any(|node| {
                    !self.toc.owns(&self.page, node) && heading::is_heading_bearing(&self.page, node)
                });
                if relevant {
                    debug!("[Main] Headings added, debouncing pipeline run");
                    self.debounce.trigger(now);
                }
            }
            PageEvent::HistoryNavigated | PageEvent::AppNavigated => {
                self.schedule
                    .push(now + self.config.timing.settle(), Task::Settled);
            }
            PageEvent::FragmentChanged => self.scroll_to_fragment(),
            PageEvent::HeadingVisible(node) => {
                let id = self.toc.entry_for_heading(&node).map(|entry| entry.id.clone());
                if let Some(id) = id {
                    self.toc.set_active(&mut self.page, &id);
                }
            }
            PageEvent::ClipboardWritten(Ok(())) => {
                if self.config.show_toast {
                    self.show_toast(now);
                }
            }
            PageEvent::ClipboardWritten(Err(e)) => {
                error!("[Anchor] Failed to copy to clipboard: {e}");
            }
        }
    }

    /// Route a click on `node`. Returns true when it was an anchor control or a
    /// sidebar entry and the host should suppress default navigation.
    pub fn click(&mut self, node: &P::Node) -> bool {
        if let Some(target) = self.processor.anchor_target(node) {
            let (id, element) = (target.id.clone(), target.heading.clone());
            heading::follow_anchor(&mut self.page, &id, &element);
            return true;
        }

        if let Some(id) = self.toc.entry_for_link(node).map(|entry| entry.id.clone()) {
            self.toc.activate_entry(&mut self.page, &id);
            return true;
        }

        false
    }

    /// Fire the debounced run and due tasks. Returns whether anything ran.
    pub fn advance(&mut self, now: Duration) -> bool {
        let mut fired = false;

        if self.debounce.poll(now) {
            self.run_pipeline();
            fired = true;
        }

        while let Some(task) = self.schedule.pop_due(now) {
            self.run_task(task, now);
            fired = true;
        }

        fired
    }

    /// Earliest time [`Orchestrator::advance`] has work to do
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.debounce.deadline(), self.schedule.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Process headings and rebuild the sidebar. Returns the heading count.
    pub fn run_pipeline(&mut self) -> usize {
        info!("[Main] Processing headings and updating TOC...");
        let headings = self.processor.process(&mut self.page);
        self.processor.release_detached(&self.page);

        info!("[Main] Updating TOC with {} headings", headings.len());
        if let Err(e) = self.toc.update(&mut self.page, &headings) {
            warn!("[Main] Failed to update TOC: {e:#}");
        }

        self.runs += 1;
        headings.len()
    }

    /// Schedule a scroll to the current fragment's target, if it exists
    pub fn apply_fragment(&mut self, now: Duration) {
        let location = self.page.location();
        let Some(id) = location.fragment() else {
            return;
        };
        if self.page.element_by_id(id).is_some() {
            self.schedule.push(
                now + self.config.timing.fragment_scroll_delay(),
                Task::ScrollToFragment(id.to_string()),
            );
        }
    }

    /// Tear down the sidebar and every anchor, and drop pending work
    pub fn shutdown(&mut self) {
        info!("[Main] Shutting down");
        self.toc.destroy(&mut self.page);
        self.processor.release_all(&mut self.page);
        self.debounce.cancel();
        for task in self.schedule.drain() {
            if let Task::Toast(node, _) = task {
                self.page.remove(&node);
            }
        }
        self.started = false;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn toc(&self) -> &Toc<P::Node> {
        &self.toc
    }

    pub fn processor(&self) -> &HeadingProcessor<P::Node> {
        &self.processor
    }

    /// Check if a debounced pipeline run is waiting
    pub fn has_pending_run(&self) -> bool {
        self.debounce.has_pending()
    }

    /// Number of completed pipeline runs
    pub fn pipeline_runs(&self) -> u64 {
        self.runs
    }

    fn run_task(&mut self, task: Task<P::Node>, now: Duration) {
        match task {
            Task::Startup => {
                info!("[Main] Running delayed initialization...");
                self.run_pipeline();
                self.apply_fragment(now);
            }
            Task::Settled => {
                self.run_pipeline();
                self.apply_fragment(now);
            }
            Task::ScrollToFragment(id) => {
                if let Some(element) = self.page.element_by_id(&id) {
                    self.page.scroll_into_view(&element, ScrollBlock::Start);
                }
            }
            Task::Toast(node, step) => toast::apply(&mut self.page, &node, step),
        }
    }

    fn scroll_to_fragment(&mut self) {
        let location = self.page.location();
        let Some(id) = location.fragment() else {
            return;
        };
        if let Some(element) = self.page.element_by_id(id) {
            self.page.scroll_into_view(&element, ScrollBlock::Start);
        }
    }

    fn show_toast(&mut self, now: Duration) {
        let node = match toast::create(&mut self.page) {
            Ok(node) => node,
            Err(e) => {
                warn!("[Anchor] Failed to show toast: {e:#}");
                return;
            }
        };

        let timing = &self.config.timing;
        let hide_at = now + timing.toast_duration();
        self.schedule.push(
            now + timing.toast_show_delay(),
            Task::Toast(node.clone(), ToastStep::Show),
        );
        self.schedule
            .push(hide_at, Task::Toast(node.clone(), ToastStep::Hide));
        self.schedule.push(
            hide_at + timing.toast_removal(),
            Task::Toast(node, ToastStep::Remove),
        );
    }
}
