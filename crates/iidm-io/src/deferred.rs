//! Work postponed until the objects it refers to have been read.
//!
//! Forward references (regulating terminals, tie line halves, selected limit groups,
//! calculated bus voltages) cannot be resolved while the referring element is parsed.
//! Codecs register a closure instead; the reader drains the queue before the first
//! extension and once more at the end of the document.

use std::fmt;

use iidm_core::{IidmResult, Network};

type Task = Box<dyn FnOnce(&mut Network) -> IidmResult<()>>;

/// FIFO queue of postponed network mutations.
#[derive(Default)]
pub struct DeferredTasks {
    tasks: Vec<Task>,
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, task: F)
    where
        F: FnOnce(&mut Network) -> IidmResult<()> + 'static,
    {
        self.tasks.push(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every queued task in registration order. The first failure aborts the drain and
    /// drops the remaining tasks.
    pub fn drain(&mut self, network: &mut Network) -> IidmResult<()> {
        let count = self.tasks.len();
        for task in std::mem::take(&mut self.tasks) {
            task(network)?;
        }
        if count > 0 {
            tracing::debug!(count, "resolved deferred references");
        }
        Ok(())
    }
}

impl fmt::Debug for DeferredTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTasks").field("pending", &self.tasks.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iidm_core::IidmError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_tasks_run_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tasks = DeferredTasks::new();
        for i in 0..3 {
            let log = Rc::clone(&log);
            tasks.register(move |_| {
                log.borrow_mut().push(i);
                Ok(())
            });
        }
        assert_eq!(tasks.len(), 3);
        let mut network = Network::new("n", "test");
        tasks.drain(&mut network).expect("drain");
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_failure_stops_drain() {
        let mut tasks = DeferredTasks::new();
        tasks.register(|_| Err(IidmError::DanglingReference("GEN".into())));
        tasks.register(|network| {
            network.forecast_distance = 42;
            Ok(())
        });
        let mut network = Network::new("n", "test");
        assert!(matches!(
            tasks.drain(&mut network),
            Err(IidmError::DanglingReference(_))
        ));
        assert_eq!(network.forecast_distance, 0);
        assert!(tasks.is_empty());
    }
}
