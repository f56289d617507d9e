use std::fmt::{self, Debug, Display};

use crate::{Network, core::NodeId};

/// Writes `x` with four decimals, padding positive values so columns line up with negative ones.
fn write_signed(f: &mut fmt::Formatter, x: f64) -> fmt::Result {
    if x.is_sign_positive() {
        write!(f, " {:.04?}", x)
    } else {
        write!(f, "{:.04?}", x)
    }
}

fn write_layer(f: &mut fmt::Formatter, network: &Network, layer: &[NodeId]) -> fmt::Result {
    for (i, &id) in layer.iter().enumerate() {
        let node = network.node(id);
        if i != 0 {
            write!(f, "  ")?;
        }
        write!(f, "{} {}:", node.kind().name(), node.label())?;
        write_signed(f, node.value())?;
    }
    Ok(())
}

/// One line per layer with the output of every node as left by the last run.
impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Input layer: ")?;
        write_layer(f, self, self.input_layer())?;
        for (i, layer) in self.hidden_layers().iter().enumerate() {
            write!(f, "\nHidden layer {}: ", i + 1)?;
            write_layer(f, self, layer)?;
        }
        write!(f, "\nOutput layer: ")?;
        write_layer(f, self, self.output_layer())
    }
}

/// Parents and weights of every non-input node.
pub struct NodeDetails<'a> {
    network: &'a Network,
}

impl Network {
    pub fn node_details(&self) -> NodeDetails<'_> {
        NodeDetails { network: self }
    }
}

impl Debug for NodeDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for NodeDetails<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let network = self.network;
        let mut first = true;
        for &id in network.layers().iter().flatten() {
            let node = network.node(id);
            if node.inputs().is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{} {} = {}(", node.kind().name(), node.label(), node.phi().name())?;
            for (slot, (&parent, &w)) in node.inputs().iter().zip(node.weights()).enumerate() {
                if slot != 0 {
                    write!(f, " ")?;
                }
                write!(f, "{w:+.04} * {}", network.node(parent).label())?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Network, NetworkConfig, activation_functions::Identity};

    #[test]
    fn layers_and_details() {
        let config = NetworkConfig::default()
            .with_activations(Identity, Identity, Identity)
            .with_bias(true);
        let mut network = Network::fully_connected(2, &[1], 1, &config).unwrap();
        let hidden = network.layers()[1][0];
        let output = network.output_layer()[0];
        network.set_weights(hidden, &[0.5, 1.0, -1.0]).unwrap();
        network.set_weights(output, &[0.0, 2.0]).unwrap();
        network.forward(faer::ColRef::from_slice(&[3.0, 1.0])).unwrap();

        assert_eq!(
            network.to_string(),
            "Input layer: InputNode 0.1: 3.0000  InputNode 0.2: 1.0000\n\
             Hidden layer 1: HiddenNode 1.1: 2.5000\n\
             Output layer: OutputNode 2.1: 5.0000"
        );
        assert_eq!(
            network.node_details().to_string(),
            "HiddenNode 1.1 = identity(+0.5000 * bias +1.0000 * 0.1 -1.0000 * 0.2)\n\
             OutputNode 2.1 = identity(+0.0000 * bias +2.0000 * 1.1)"
        );
    }
}
