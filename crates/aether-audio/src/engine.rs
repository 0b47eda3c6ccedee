//! Audio engine - explicit ownership of the output oscillator
//!
//! The engine starts disarmed: platforms commonly refuse to start audio
//! before the first user interaction. `arm` starts the sink, `update` pushes
//! parameters while armed, and `dispose` (or drop) stops it for good.

use thiserror::Error;

use crate::OscillatorParams;

/// Audio errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    #[error("Audio engine disposed")]
    Disposed,
}

/// Output oscillator provided by the platform
pub trait OscillatorSink {
    /// Start producing sound at `initial`
    fn start(&mut self, initial: OscillatorParams) -> Result<(), AudioError>;

    /// Ramp toward `params`
    fn set_params(&mut self, params: OscillatorParams);

    /// Stop and release the output
    fn stop(&mut self);
}

impl<S: OscillatorSink + ?Sized> OscillatorSink for Box<S> {
    fn start(&mut self, initial: OscillatorParams) -> Result<(), AudioError> {
        (**self).start(initial)
    }

    fn set_params(&mut self, params: OscillatorParams) {
        (**self).set_params(params)
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Disarmed,
    Armed,
    Disposed,
}

pub struct AudioEngine<S: OscillatorSink> {
    sink: S,
    state: EngineState,
    last: Option<OscillatorParams>,
}

impl<S: OscillatorSink> AudioEngine<S> {
    pub fn new(sink: S) -> Self {
        AudioEngine {
            sink,
            state: EngineState::Disarmed,
            last: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == EngineState::Armed
    }

    /// Start the sink. Arming twice is a no-op.
    pub fn arm(&mut self) -> Result<(), AudioError> {
        match self.state {
            EngineState::Armed => Ok(()),
            EngineState::Disposed => Err(AudioError::Disposed),
            EngineState::Disarmed => {
                self.sink.start(OscillatorParams::INITIAL)?;
                self.state = EngineState::Armed;
                self.last = Some(OscillatorParams::INITIAL);
                tracing::info!("audio armed");
                Ok(())
            }
        }
    }

    /// Push parameters. Ignored unless armed.
    pub fn update(&mut self, params: OscillatorParams) -> bool {
        if self.state != EngineState::Armed {
            return false;
        }
        self.sink.set_params(params);
        self.last = Some(params);
        true
    }

    /// Last parameters sent to the sink
    pub fn last_params(&self) -> Option<OscillatorParams> {
        self.last
    }

    pub fn dispose(&mut self) {
        if self.state == EngineState::Disposed {
            return;
        }
        if self.state == EngineState::Armed {
            self.sink.stop();
            tracing::debug!("audio sink stopped");
        }
        self.state = EngineState::Disposed;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: OscillatorSink> Drop for AudioEngine<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<S: OscillatorSink> std::fmt::Debug for AudioEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("state", &self.state)
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        started: Vec<OscillatorParams>,
        params: Vec<OscillatorParams>,
        stops: usize,
    }

    struct RecordingSink(Rc<RefCell<Log>>);

    impl OscillatorSink for RecordingSink {
        fn start(&mut self, initial: OscillatorParams) -> Result<(), AudioError> {
            self.0.borrow_mut().started.push(initial);
            Ok(())
        }

        fn set_params(&mut self, params: OscillatorParams) {
            self.0.borrow_mut().params.push(params);
        }

        fn stop(&mut self) {
            self.0.borrow_mut().stops += 1;
        }
    }

    struct DeniedSink;

    impl OscillatorSink for DeniedSink {
        fn start(&mut self, _: OscillatorParams) -> Result<(), AudioError> {
            Err(AudioError::Unavailable("autoplay blocked".into()))
        }
        fn set_params(&mut self, _: OscillatorParams) {}
        fn stop(&mut self) {}
    }

    #[test]
    fn test_updates_ignored_until_armed() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = AudioEngine::new(RecordingSink(log.clone()));
        let params = OscillatorParams {
            frequency: 300.0,
            gain: 0.05,
        };

        assert!(!engine.update(params));
        engine.arm().unwrap();
        engine.arm().unwrap();
        assert!(engine.update(params));

        let log = log.borrow();
        assert_eq!(log.started, vec![OscillatorParams::INITIAL]);
        assert_eq!(log.params, vec![params]);
    }

    #[test]
    fn test_drop_stops_once() {
        let log = Rc::new(RefCell::new(Log::default()));
        {
            let mut engine = AudioEngine::new(RecordingSink(log.clone()));
            engine.arm().unwrap();
            engine.dispose();
            assert_eq!(engine.arm(), Err(AudioError::Disposed));
        }
        assert_eq!(log.borrow().stops, 1);
    }

    #[test]
    fn test_failed_arm_stays_disarmed() {
        let mut engine = AudioEngine::new(DeniedSink);
        assert!(engine.arm().is_err());
        assert_eq!(engine.state(), EngineState::Disarmed);
    }
}
