use nalgebra::{DMatrix, DVector};

/// Plot every state variable of a D x N trajectory against time, one PNG per
/// variable.
pub fn plots(arg: String, values: Vec<String>, t_result: DVector<f64>, y_result: DMatrix<f64>) {
    use plotters::prelude::*;
    let x = t_result;
    let y = y_result;
    let x_min = x.min();
    let x_max = x.max();
    for row in 0..y.nrows() {
        let y_row = y.row(row);
        let y_min = y_row.min();
        let y_max = y_row.max();
        let varname = values[row].clone();
        let filename = format!("{}.png", varname);
        let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
        root_area.fill(&WHITE).unwrap();

        let mut chart = ChartBuilder::on(&root_area)
            .caption(format!("{}", varname), ("sans-serif", 50))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(30)
            .build_cartesian_2d(x_min * 0.95..x_max * 1.05, y_min * 0.95..y_max * 1.05)
            .unwrap();

        chart
            .configure_mesh()
            .x_desc(&arg)
            .y_desc(&varname)
            .draw()
            .unwrap();

        let series: Vec<(f64, f64)> = x.iter().zip(y_row.iter()).map(|(&x, &y)| (x, y)).collect();
        chart
            .draw_series(LineSeries::new(series, &Palette99::pick(row)))
            .unwrap()
            .label(format!(" {}", varname))
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], &Palette99::pick(row))
            });

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .unwrap();
    }
}

/// Overlay a surrogate prediction on a reference trajectory, one PNG per
/// variable (reference solid blue, prediction red).
pub fn plot_overlay(
    arg: String,
    values: Vec<String>,
    t: DVector<f64>,
    y_reference: DMatrix<f64>,
    y_prediction: DMatrix<f64>,
    tag: &str,
) {
    use plotters::prelude::*;
    assert_eq!(y_reference.shape(), y_prediction.shape());
    let x_min = t.min();
    let x_max = t.max();
    for row in 0..y_reference.nrows() {
        let y_min = y_reference.row(row).min().min(y_prediction.row(row).min());
        let y_max = y_reference.row(row).max().max(y_prediction.row(row).max());
        let varname = values[row].clone();
        let filename = format!("{}_{}.png", tag, varname);
        let root_area = BitMapBackend::new(&filename, (800, 600)).into_drawing_area();
        root_area.fill(&WHITE).unwrap();

        let mut chart = ChartBuilder::on(&root_area)
            .caption(format!("{} ({})", varname, tag), ("sans-serif", 40))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(30)
            .build_cartesian_2d(x_min * 0.95..x_max * 1.05, y_min * 0.95..y_max * 1.05)
            .unwrap();

        chart
            .configure_mesh()
            .x_desc(&arg)
            .y_desc(&varname)
            .draw()
            .unwrap();

        let reference: Vec<(f64, f64)> = t
            .iter()
            .zip(y_reference.row(row).iter())
            .map(|(&x, &y)| (x, y))
            .collect();
        let prediction: Vec<(f64, f64)> = t
            .iter()
            .zip(y_prediction.row(row).iter())
            .map(|(&x, &y)| (x, y))
            .collect();
        chart
            .draw_series(LineSeries::new(reference, &BLUE))
            .unwrap()
            .label("reference")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
        chart
            .draw_series(LineSeries::new(prediction, &RED))
            .unwrap()
            .label("prediction")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .unwrap();
    }
}
