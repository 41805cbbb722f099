#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hairvision_engine::{BackendUrls, EngineEvent, EngineSettings, EventSink};

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Lines { lines, .. } => Some(lines.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn settings_for(uri: &str) -> EngineSettings {
    let urls = BackendUrls {
        jobs: uri.to_string(),
        classify: uri.to_string(),
    };
    EngineSettings {
        local: urls.clone(),
        remote: urls,
        ..EngineSettings::default()
    }
}
