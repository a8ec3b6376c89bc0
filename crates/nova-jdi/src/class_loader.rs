use crate::codec::JdwpWriter;
use crate::commands;
use crate::error::Result;
use crate::id::IdKind;
use crate::mirror::Tag;
use crate::object::object_mirror;
use crate::reference_type::ReferenceType;

object_mirror! {
    /// A class loader instance in the target runtime.
    ///
    /// The bootstrap loader has no mirror: wherever the protocol reports it,
    /// the API yields `None`.
    ClassLoaderReference,
    tag: Tag::ClassLoader,
    id_kind: IdKind::ClassLoader,
    label: "classLoaderReference"
}

impl ClassLoaderReference {
    /// `ClassLoaderReference.VisibleClasses (14, 1)`
    ///
    /// Every type this loader has been asked to load, in the order the target
    /// runtime reports them. Entries with a null type id are dropped.
    ///
    /// Never cached: classes load and unload between calls.
    pub async fn visible_classes(&self) -> Result<Vec<ReferenceType>> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        self.vm
            .request_with(
                commands::class_loader_reference::VISIBLE_CLASSES,
                w.into_vec(),
                |r| {
                    let count = r.read_count()?;
                    let mut classes = Vec::with_capacity(count.min(r.remaining()));
                    for _ in 0..count {
                        if let Some(ty) = ReferenceType::read_with_type_tag(&self.vm, r)? {
                            classes.push(ty);
                        }
                    }
                    Ok(classes)
                },
            )
            .await
    }

    /// The visible classes whose defining loader is this loader.
    ///
    /// A type that is visible but not yet prepared cannot report its loader;
    /// it is left out instead of failing the whole enumeration. Any other
    /// error aborts.
    pub async fn defined_classes(&self) -> Result<Vec<ReferenceType>> {
        let visible = self.visible_classes().await?;
        let mut defined = Vec::with_capacity(visible.len());
        for ty in visible {
            match ty.class_loader().await {
                Ok(Some(loader)) if loader == *self => defined.push(ty),
                Ok(_) => {}
                Err(err) if err.is_class_not_prepared() => {
                    tracing::trace!(
                        target: "nova.jdi",
                        reference_type = %ty,
                        "skipping unprepared type while collecting defined classes"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(defined)
    }
}
