use ammonia::Builder;

pub const MODAL_SUCCESS: &str = "modal_success";
pub const MODAL_ERROR: &str = "modal_error";
pub const MODAL_CONFIRM: &str = "modal_confirm";

/// What a dialog's confirm control submits to.
pub trait ModalAction {
    fn form_action(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog<A> {
    pub title: String,
    pub body: String,
    pub visible: bool,
    action: Option<A>,
}

impl<A> Dialog<A> {
    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }
}

/// Dialog slots addressed by id, each showing one message at a time.
#[derive(Debug, Clone)]
pub struct ModalPresenter<A> {
    dialogs: Vec<(String, Dialog<A>)>,
}

impl<A> Default for ModalPresenter<A> {
    fn default() -> Self {
        Self { dialogs: vec![] }
    }
}

impl<A> ModalPresenter<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills dialog `id` and makes it visible. The confirmation action replaces
    /// whatever was bound before, so at most one is ever attached.
    pub fn show(&mut self, id: &str, title: &str, body_html: &str, action: Option<A>) {
        let dialog = Dialog {
            title: title.to_string(),
            body: sanitize_body(body_html),
            visible: true,
            action,
        };
        match self.dialogs.iter_mut().find(|(x, _)| x == id) {
            Some((_, slot)) => *slot = dialog,
            None => self.dialogs.push((id.to_string(), dialog)),
        }
    }

    pub fn hide(&mut self, id: &str) {
        if let Some((_, dialog)) = self.dialogs.iter_mut().find(|(x, _)| x == id) {
            dialog.visible = false;
        }
    }

    pub fn dialog(&self, id: &str) -> Option<&Dialog<A>> {
        self.dialogs.iter().find(|(x, _)| x == id).map(|(_, d)| d)
    }

    /// Unbinds and returns the confirmation action of `id`. Running it, and
    /// dealing with its errors, is up to the caller.
    pub fn take_action(&mut self, id: &str) -> Option<A> {
        self.dialogs.iter_mut().find(|(x, _)| x == id).and_then(|(_, d)| d.action.take())
    }

    pub fn visible(&self) -> impl Iterator<Item = (&str, &Dialog<A>)> {
        self.dialogs.iter().filter(|(_, d)| d.visible).map(|(id, d)| (id.as_str(), d))
    }
}

/// Dialog bodies may carry simple markup and form inputs, nothing else.
fn sanitize_body(html: &str) -> String {
    Builder::default()
        .add_tags(&["input"])
        .add_tag_attributes("input", &["type", "name", "id", "autocomplete", "required"])
        .clean(html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Confirm(u32);

    #[test]
    fn show_replaces_content_and_action() {
        let mut modals = ModalPresenter::new();
        modals.show(MODAL_CONFIRM, "Are you sure?", "<p>first</p>", Some(Confirm(1)));
        modals.show(MODAL_CONFIRM, "Really?", "<p>second</p>", Some(Confirm(2)));

        let dialog = modals.dialog(MODAL_CONFIRM).unwrap();
        assert_eq!(dialog.title, "Really?");
        assert_eq!(dialog.body, "<p>second</p>");
        assert_eq!(modals.visible().count(), 1);

        assert_eq!(modals.take_action(MODAL_CONFIRM), Some(Confirm(2)));
        assert_eq!(modals.take_action(MODAL_CONFIRM), None);
    }

    #[test]
    fn showing_without_action_unbinds_previous_one() {
        let mut modals = ModalPresenter::new();
        modals.show(MODAL_ERROR, "Error", "x", Some(Confirm(1)));
        modals.show(MODAL_ERROR, "Error", "y", None);
        assert!(modals.dialog(MODAL_ERROR).unwrap().action().is_none());
    }

    #[test]
    fn hide_keeps_dialog_but_not_visible() {
        let mut modals = ModalPresenter::<Confirm>::new();
        modals.show(MODAL_SUCCESS, "Saved", "ok", None);
        modals.show(MODAL_ERROR, "Error", "bad", None);
        modals.hide(MODAL_SUCCESS);
        let visible = modals.visible().map(|(id, _)| id).collect::<Vec<_>>();
        assert_eq!(visible, vec![MODAL_ERROR]);
    }

    #[test]
    fn body_is_sanitized() {
        let mut modals = ModalPresenter::<Confirm>::new();
        modals.show(
            MODAL_CONFIRM,
            "t",
            "<p>enter password</p><input type='password' name='password'/><script>alert(1)</script>",
            None,
        );
        let body = &modals.dialog(MODAL_CONFIRM).unwrap().body;
        assert!(body.contains("<input type=\"password\" name=\"password\">"));
        assert!(!body.contains("script"));
    }
}
