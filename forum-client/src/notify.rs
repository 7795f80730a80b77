use std::{cell::RefCell, rc::Rc};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Tone {
    Success,
    Failure,
}

/// Transient message for the view layer to show, eg. as a toast
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub tone: Tone,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Notice {
        Notice {
            tone: Tone::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Notice {
        Notice {
            tone: Tone::Failure,
            message: message.into(),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Keeps every notice until taken
impl Notifier for RefCell<Vec<Notice>> {
    fn notify(&self, notice: Notice) {
        self.borrow_mut().push(notice);
    }
}

impl<T: Notifier + ?Sized> Notifier for Rc<T> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}

/// Asks the user to confirm a destructive action
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
