mod secret_hygiene;
mod trust_anchors;
